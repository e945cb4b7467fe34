pub mod memory;
pub mod provider;
pub mod repository;
pub mod types;

pub use memory::InMemoryDataProvider;
pub use provider::{required_data_points, DataProvider};
pub use repository::AssetDataRepository;
pub use types::{AssetData, DataError, RiskFreeRates};
