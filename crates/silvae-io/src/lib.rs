//! File I/O, validation, and serialization for the silvae pipeline.

mod dataset_reader;
mod domain;
mod ensemble_reader;
mod error;
mod proximity_reader;
mod writer;

pub use dataset_reader::DatasetReader;
pub use domain::ExperimentName;
pub use ensemble_reader::EnsembleReader;
pub use error::IoError;
pub use proximity_reader::ProximityReader;
pub use writer::ResultWriter;
