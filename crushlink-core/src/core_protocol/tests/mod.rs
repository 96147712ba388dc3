//! End-to-end protocol tests over the mock engine
