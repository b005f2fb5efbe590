use std::io::Error as IoError;

use thiserror::Error;

use crate::tier::{TIER_ENV, Tier};

#[derive(Error, Debug)]
pub enum Error {
	#[error("The {} environment variable is not set. Expected one of: {}", TIER_ENV, Tier::ALLOWED.join(", "))]
	MissingTier,

	#[error("The value '{0}' of {} is invalid. Expected one of: {}", TIER_ENV, Tier::ALLOWED.join(", "))]
	InvalidTier(String),

	#[error("There was a problem connecting to the database: {0}")]
	Database(#[from] sqlx::Error),

	#[error("There was a problem initialising the logger: {0}")]
	Logger(String),

	#[error("There was an I/O error: {0}")]
	Io(#[from] IoError),
}
