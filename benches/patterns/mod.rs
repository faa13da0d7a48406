pub mod fanout;
pub mod groups;
