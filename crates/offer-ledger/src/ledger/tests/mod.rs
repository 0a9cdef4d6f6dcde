mod common;
mod entries;
