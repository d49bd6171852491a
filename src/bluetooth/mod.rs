pub mod scanner;

pub use scanner::{AdvertisementEvent, BleScanner};
