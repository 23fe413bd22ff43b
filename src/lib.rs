pub mod client;
pub mod error;
pub mod submissions;
pub mod transport;

pub use client::{ClientConfig, ClientConfigBuilder, SubmissionClient};
pub use error::{RequestFailure, Result, SubmissionError};
pub use submissions::{DriverState, StatusResponse};
pub use transport::{HttpRequest, HttpTransport, Transport};

pub mod config {
    use std::{fs, path::Path};
    use serde::Deserialize;

    /// Returns the first candidate that exists and parses.
    pub fn load_config<T, P>(paths: &[P]) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
        P: AsRef<Path>,
    {
        for path in paths {
            let path = path.as_ref();
            if let Ok(config_content) = fs::File::open(path) {
                log::debug!("loading {}", path.display());
                match serde_yaml::from_reader::<_, T>(&config_content) {
                    Ok(config) => {
                        log::debug!("configuration loaded from {}", path.display());
                        return Some(config);
                    }
                    Err(err) => log::debug!("failed to parse config {}: {}", path.display(), err),
                }
            }
        }
        None
    }

}
