mod article;
mod memory;
mod traits;

pub use article::SqliteArticleRepository;
pub use memory::InMemoryArticleRepository;
pub use traits::ArticleRepository;
