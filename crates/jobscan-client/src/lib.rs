pub mod extractor;
pub mod fetcher;

pub use extractor::{CompiledLayout, SelectorExtractor};
pub use fetcher::{ProxyConfig, ProxyFetcher};
