pub mod function;

pub use function::{create_client, ClientConfig, ScannerClient, ScannerError};
