/// Closed interval spanned by two values, in either order.
pub struct Range<T> {
    low: T,
    high: T,
}

impl<T: PartialOrd> Range<T> {
    pub fn new(a: T, b: T) -> Self {
        if a > b { Self { low: b, high: a } } else { Self { low: a, high: b } }
    }

    pub fn contains(&self, value: &T) -> bool {
        value >= &self.low && value <= &self.high
    }
}
