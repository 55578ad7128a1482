/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Error classification.
//!
//! Failures carry an [`ErrorKind`] as `failure` context so callers can
//! distinguish recoverable situations (fix the configuration, free memory)
//! from invalidated results and outright bugs.

use crate::FailResult;
use failure::{Context, Error, Fail};

#[derive(Debug, Fail, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An unknown form name, a malformed target list, a bad cutoff.
    /// Surfaced from registration; the step is never attempted.
    #[fail(display = "configuration error")]
    Configuration,

    /// An allocation bound was exceeded; free memory or reduce scale.
    #[fail(display = "resource exhaustion")]
    Resource,

    /// Evaluation was attempted with no atoms, no cell, or unassigned
    /// indices; no observable is produced.
    #[fail(display = "evaluation attempted in an unusable state")]
    State,

    /// A kernel produced a non-finite value, or a smoothening interval is
    /// degenerate; the step's observable is invalid.
    #[fail(display = "numerical instability")]
    Numerical,

    /// A cache invariant was violated. Indicates a bug, not recoverable.
    #[fail(display = "internal invariant violation")]
    Internal,
}

/// The kind attached to an error, if any.
pub fn kind_of(error: &Error) -> Option<ErrorKind> {
    error.iter_chain()
        .filter_map(|fail| fail.downcast_ref::<Context<ErrorKind>>())
        .map(|context| *context.get_context())
        .next()
}

/// Attach a kind to every error produced by a fallible computation.
pub fn with_kind<T>(kind: ErrorKind, result: FailResult<T>) -> FailResult<T> {
    result.map_err(|error| error.context(kind).into())
}

pub fn config_err(message: String) -> Error {
    format_err!("{}", message).context(ErrorKind::Configuration).into()
}

pub fn state_err(message: String) -> Error {
    format_err!("{}", message).context(ErrorKind::State).into()
}

pub fn numerical_err(message: String) -> Error {
    format_err!("{}", message).context(ErrorKind::Numerical).into()
}

pub fn resource_err(message: String) -> Error {
    format_err!("{}", message).context(ErrorKind::Resource).into()
}

pub fn internal_err(message: String) -> Error {
    format_err!("{}", message).context(ErrorKind::Internal).into()
}
