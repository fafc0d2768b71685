use std::path::PathBuf;

use crate::{
    SegmentGraphError,
    config::{EngineConfig, ProcedureMode},
    engine::{FetchType, ResolveRequest, SegmentEngine},
    sqlite_store::SqliteRelationStore,
    types::RelationKind,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLineConfig {
    pub database: Option<String>,
    pub config_dir: Option<PathBuf>,
    pub token: Option<String>,
    pub fetch_type: FetchType,
    pub no_procedures: bool,
    pub command: String,
    pub path: Option<String>,
}

impl CommandLineConfig {
    pub fn from_args(args: &[&str]) -> Result<Self, String> {
        let mut database = None;
        let mut config_dir = None;
        let mut token = None;
        let mut fetch_type = FetchType::Normal;
        let mut no_procedures = false;
        let mut command = String::from("resolve");
        let mut path = None;
        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match *arg {
                "--db" | "--database" => {
                    database = Some(
                        iter.next()
                            .ok_or_else(|| "--db requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--config" => {
                    config_dir = Some(PathBuf::from(
                        iter.next()
                            .ok_or_else(|| "--config requires a value".to_string())?,
                    ));
                }
                "--token" => {
                    token = Some(
                        iter.next()
                            .ok_or_else(|| "--token requires a value".to_string())?
                            .to_string(),
                    );
                }
                "--fetch-type" => {
                    fetch_type = FetchType::parse(
                        iter.next()
                            .ok_or_else(|| "--fetch-type requires a value".to_string())?,
                    );
                }
                "--no-procedures" => no_procedures = true,
                "--command" => {
                    command = iter
                        .next()
                        .ok_or_else(|| "--command requires a value".to_string())?
                        .to_string();
                }
                other if other.starts_with("--") => {
                    return Err(format!("unknown flag {other}"));
                }
                other => {
                    if path.is_some() {
                        return Err(format!("unexpected argument {other}"));
                    }
                    path = Some(other.to_string());
                }
            }
        }
        Ok(Self {
            database,
            config_dir,
            token,
            fetch_type,
            no_procedures,
            command,
            path,
        })
    }

    pub fn help() -> &'static str {
        "Usage: segmentgraph [--db memory|PATH] [--config DIR] [--token TOKEN] \
         [--fetch-type normal|tree] [--no-procedures] \
         [--command resolve|ping|status|seed] [PATH]\n"
    }

    /// Layers command-line flags over an already loaded configuration.
    pub fn apply(&self, mut config: EngineConfig) -> EngineConfig {
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if self.no_procedures {
            config.procedures = ProcedureMode::Disabled;
        }
        config
    }

    pub fn request(&self) -> ResolveRequest {
        ResolveRequest {
            path: self.path.clone().unwrap_or_else(|| "/".to_string()),
            fetch_type: self.fetch_type,
            token: self.token.clone(),
        }
    }
}

pub fn open_engine(
    config: EngineConfig,
) -> Result<SegmentEngine<SqliteRelationStore>, SegmentGraphError> {
    let store =
        SqliteRelationStore::open_target(&config.database)?.with_procedures(config.procedures);
    Ok(SegmentEngine::new(store, config))
}

/// Writes a small hierarchy: `docs/guide` bound to markdown content, plus a
/// `media/logo` segment whose content is a binary PNG reference.
pub fn seed_scenario(store: &SqliteRelationStore) -> Result<(), SegmentGraphError> {
    store.insert_segment("1", "docs")?;
    store.insert_segment("2", "guide")?;
    store.insert_relation("1", "2", RelationKind::Direct)?;
    store.insert_content("10", 3, "# Hello")?;
    store.insert_relation("2", "10", RelationKind::Bound)?;

    store.insert_segment("3", "media")?;
    store.insert_segment("4", "logo")?;
    store.insert_relation("3", "4", RelationKind::Direct)?;
    store.insert_content("11", 10, "binary:blob-logo")?;
    store.insert_relation("4", "11", RelationKind::Bound)?;
    store.insert_binary(
        "blob-logo",
        &crate::materialize::encode_binary(&[0x89, b'P', b'N', b'G']),
    )?;
    Ok(())
}
