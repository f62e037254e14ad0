//! Domain entities - the core business objects.

mod category;
mod comment;
mod post;
mod tag;
mod user;

pub use category::{Category, CategoryWithCount};
pub use comment::{Comment, CommentThread, Reply};
pub use post::{Post, PostSummary};
pub use tag::Tag;
pub use user::User;
