mod degree_celsius;

pub use degree_celsius::DegreeCelsius;
