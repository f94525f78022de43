//! Behaviour flags.
//!
//! Operations that have more than one sensible policy take a `&[Flag]`.
//! Each operation accepts only the flags listed in its allow-list; passing
//! any other flag, or two flags that contradict each other, is a usage error
//! and panics.

use serde::{Deserialize, Serialize};

/// Named option passed to construction and projection functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// When merging with a cause's data, the cause's value wins.
    PreferPreviousData,
    /// When merging with a cause's data, the new value wins. The default.
    ReplacePreviousData,
    /// When merging with a cause's data, differing values are an error.
    ErrorOnConflict,
    /// When projecting, fields absent from the error take their default value.
    MissingDataAsZero,
    /// When projecting, fields absent from the error are an error. The default.
    MissingDataIsError,
    /// When projecting, panic instead of returning an error.
    PanicOnInconsistency,
}

/// Flags accepted by constructors and the add/merge operations.
pub const CONSTRUCT_FLAGS: &[Flag] = &[
    Flag::PreferPreviousData,
    Flag::ReplacePreviousData,
    Flag::ErrorOnConflict,
];

/// Flags accepted by projections onto record types.
pub const PROJECT_FLAGS: &[Flag] = &[
    Flag::MissingDataAsZero,
    Flag::MissingDataIsError,
    Flag::PanicOnInconsistency,
];

/// How a cause's data is merged underneath new data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    #[default]
    Replace,
    KeepPrevious,
    ErrorOnConflict,
}

/// What a projection does with a field the error does not carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingData {
    #[default]
    IsError,
    AsZero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct ProjectOptions {
    pub missing: MissingData,
    pub panic: bool,
}

fn check_allowed(caller: &str, flags: &[Flag], allowed: &[Flag]) {
    if let Some(flag) = flags.iter().find(|f| !allowed.contains(f)) {
        panic!(
            "{caller}: flag {flag:?} is not recognized here (accepted: {allowed:?})"
        );
    }
}

fn exclusive(caller: &str, flags: &[Flag], group: &[Flag]) -> Option<Flag> {
    let mut chosen: Option<Flag> = None;
    for flag in flags.iter().filter(|f| group.contains(f)) {
        match chosen {
            Some(prev) if prev != *flag => {
                panic!("{caller}: flags {prev:?} and {flag:?} contradict each other")
            }
            _ => chosen = Some(*flag),
        }
    }
    chosen
}

pub(crate) fn merge_policy(caller: &str, flags: &[Flag]) -> MergePolicy {
    check_allowed(caller, flags, CONSTRUCT_FLAGS);
    match exclusive(caller, flags, CONSTRUCT_FLAGS) {
        Some(Flag::PreferPreviousData) => MergePolicy::KeepPrevious,
        Some(Flag::ErrorOnConflict) => MergePolicy::ErrorOnConflict,
        _ => MergePolicy::Replace,
    }
}

pub(crate) fn project_options(caller: &str, flags: &[Flag]) -> ProjectOptions {
    check_allowed(caller, flags, PROJECT_FLAGS);
    let missing = match exclusive(
        caller,
        flags,
        &[Flag::MissingDataAsZero, Flag::MissingDataIsError],
    ) {
        Some(Flag::MissingDataAsZero) => MissingData::AsZero,
        _ => MissingData::IsError,
    };
    ProjectOptions {
        missing,
        panic: flags.contains(&Flag::PanicOnInconsistency),
    }
}
