//! Integration tests driving the bundle-rail binary

mod helpers;
mod test_inject;
mod test_prepare;
mod test_release;
