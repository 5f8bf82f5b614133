mod common;
mod predict;
