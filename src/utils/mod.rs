pub mod cancel;

#[cfg(test)]
mod cancel_test;
