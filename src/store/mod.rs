mod controller;

#[cfg(test)]
mod tests;

pub use controller::{AssetStoreController, PackSelection, StoreCatalog, StoreView};
