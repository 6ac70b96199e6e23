use super::*;

mod arxiv_lookup;
mod download_completion;
