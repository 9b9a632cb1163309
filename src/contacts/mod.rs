mod store;

pub use store::ContactStore;
