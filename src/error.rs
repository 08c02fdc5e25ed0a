// SPDX-License-Identifier: Apache-2.0

use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::{io, result};
use amplify_derive::Display;
use crate::pool::PoolError;

pub type ErrorBox = Box<dyn StdError + Send + Sync>;
pub type Result<T = ()> = result::Result<T, Error>;

/// The operation an [`Error`] occurred in.
#[derive(Copy, Clone, Debug, Default, Display)]
pub enum OperationKind {
	#[default]
	#[display("unknown operation")]
	Unknown,
	#[display("read into buffer")]
	Read,
	#[display("write from buffer")]
	Write,
	#[display("reserve buffer space")]
	Reserve,
	#[display("{0}")]
	Other(&'static str),
}

#[derive(Copy, Clone, Debug, Display)]
pub enum ErrorKind {
	/// An IO error reported by the [`IoHandle`](crate::IoHandle) collaborator.
	#[display("IO error")]
	Io,
	/// The handle cannot transfer bytes without blocking. The surrounding
	/// event loop retries; the buffer does not.
	#[display("operation would block")]
	WouldBlock,
	#[display("segment pool error")]
	Pool,
	#[display("{0}")]
	Other(&'static str),
}

/// The error type for buffer IO operations, carrying the operation it occurred
/// in, an error kind, and an optional source. Invariant violations are *not*
/// errors of this type; those are programmer errors and panic instead.
#[derive(Debug)]
pub struct Error {
	op: OperationKind,
	kind: ErrorKind,
	source: Option<ErrorBox>,
}

impl Display for Error {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let Self { op, kind, source } = self;
		if let Some(source) = source {
			write!(f, "{op} failed; {kind} ({source})")
		} else {
			write!(f, "{op} failed; {kind}")
		}
	}
}

impl StdError for Error {
	fn source(&self) -> Option<&(dyn StdError + 'static)> {
		if let Some(ref source) = self.source {
			Some(source.as_ref())
		} else {
			None
		}
	}
}

impl Error {
	pub(crate) fn new(op: OperationKind, kind: ErrorKind, source: Option<ErrorBox>) -> Self {
		Self { op, kind, source }
	}

	/// Creates a new IO error. A source with [`io::ErrorKind::WouldBlock`]
	/// maps to [`ErrorKind::WouldBlock`].
	pub fn io(op: OperationKind, error: io::Error) -> Self {
		let kind = if let io::ErrorKind::WouldBlock = error.kind() {
			ErrorKind::WouldBlock
		} else {
			ErrorKind::Io
		};
		Self::new(op, kind, Some(error.into()))
	}

	/// Creates a new segment pool error.
	pub fn pool(op: OperationKind, error: PoolError) -> Self {
		Self::new(op, ErrorKind::Pool, Some(error.into()))
	}

	/// Creates a new error with a custom message.
	pub fn other(op: OperationKind, message: &'static str) -> Self {
		Self::new(op, ErrorKind::Other(message), None)
	}

	/// Returns the operation kind.
	pub fn operation(&self) -> OperationKind { self.op }

	/// Sets the operation kind.
	pub fn with_operation(mut self, op: OperationKind) -> Self {
		self.op = op;
		self
	}

	/// Returns the error kind.
	pub fn kind(&self) -> ErrorKind { self.kind }

	/// Returns `true` for a would-block outcome, which the event loop handles
	/// by retrying when the handle is ready again.
	pub fn is_would_block(&self) -> bool {
		matches!(self.kind, ErrorKind::WouldBlock)
	}

	/// Returns the source downcast into an IO error, if possible.
	pub fn io_source(&self) -> Option<&io::Error> {
		self.source()?.downcast_ref()
	}
}

impl From<io::Error> for Error {
	fn from(value: io::Error) -> Self {
		Self::io(OperationKind::Unknown, value)
	}
}
