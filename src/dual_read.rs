use crate::{
    errors::FailureCode,
    strategy::ResolveStrategy,
    types::{Content, ListingItem},
};

#[derive(Debug, PartialEq, Eq)]
pub enum DualReadResult<T> {
    Match,
    Mismatch { base: T, other: T },
}

pub fn compare_outcomes<T: PartialEq + Clone>(base: &T, other: &T) -> DualReadResult<T> {
    if base == other {
        DualReadResult::Match
    } else {
        DualReadResult::Mismatch {
            base: base.clone(),
            other: other.clone(),
        }
    }
}

/// Runs the same request through two strategies and compares payloads,
/// ignoring transport metadata such as failure messages.
pub struct DualReader<B1, B2> {
    base: B1,
    other: B2,
}

impl<B1, B2> DualReader<B1, B2> {
    pub fn new(base: B1, other: B2) -> Self {
        Self { base, other }
    }
}

impl<B1, B2> DualReader<B1, B2>
where
    B1: ResolveStrategy,
    B2: ResolveStrategy,
{
    pub fn compare_listing(
        &self,
        names: &[String],
    ) -> DualReadResult<Result<Vec<ListingItem>, FailureCode>> {
        let read = |strategy: &dyn ResolveStrategy| {
            strategy
                .list_children(names)
                .map(|listing| listing.items)
                .map_err(|failure| failure.code)
        };
        compare_outcomes(&read(&self.base), &read(&self.other))
    }

    pub fn compare_content(&self, names: &[String]) -> DualReadResult<Result<Content, FailureCode>> {
        let read = |strategy: &dyn ResolveStrategy| {
            strategy.find_content(names).map_err(|failure| failure.code)
        };
        compare_outcomes(&read(&self.base), &read(&self.other))
    }
}
