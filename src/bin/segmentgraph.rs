use std::{
    env,
    io::{self, Write},
    path::PathBuf,
    process,
};

use segmentgraph::{
    EngineConfig, SegmentEngine, SegmentGraphError,
    client::{CommandLineConfig, open_engine, seed_scenario},
    sqlite_store::SqliteRelationStore,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", CommandLineConfig::help());
        return;
    }
    let arg_refs: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
    let cli = match CommandLineConfig::from_args(&arg_refs) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    };

    let config_dir = cli.config_dir.clone().unwrap_or_else(|| PathBuf::from("."));
    let config = cli.apply(EngineConfig::load(&config_dir));
    let engine = match open_engine(config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("{err}");
            process::exit(2);
        }
    };

    match run_command(&engine, &cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(err) => {
            eprintln!("command failed: {err}");
            process::exit(1);
        }
    }
}

/// Returns whether the command succeeded.
fn run_command(
    engine: &SegmentEngine<SqliteRelationStore>,
    cli: &CommandLineConfig,
) -> Result<bool, SegmentGraphError> {
    match cli.command.as_str() {
        "resolve" => {
            let reply = engine.handle(&cli.request()).render();
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&reply.body)
                .and_then(|_| stdout.write_all(b"\n"))
                .map_err(|e| SegmentGraphError::output(e.to_string()))?;
            Ok(reply.is_success())
        }
        "ping" => {
            let reply = engine.ping(cli.token.as_deref());
            let body = serde_json::to_string(&reply)
                .map_err(|e| SegmentGraphError::output(e.to_string()))?;
            println!("{body}");
            Ok(reply.code == 0)
        }
        "status" => {
            let counts = engine.store().counts()?;
            println!(
                "backend=sqlite procedures={:?} segments={} contents={} binaries={} relations={}",
                engine.store().procedures(),
                counts.segments,
                counts.contents,
                counts.binaries,
                counts.relations
            );
            Ok(true)
        }
        "seed" => {
            seed_scenario(engine.store())?;
            println!("seeded {}", engine.config().database);
            Ok(true)
        }
        other => {
            eprintln!("unknown command {other}");
            Ok(false)
        }
    }
}
