use im::Vector;

pub trait PushImmut<T> {
    fn push(&self, item: T) -> Vector<T>;
}
impl<T: Clone> PushImmut<T> for Vector<T> {
    fn push(&self, item: T) -> Vector<T> {
        let mut result = self.clone();
        result.push_back(item);
        result
    }
}

pub trait MapAtImmut<T> {
    /// Replaces the element at `idx` with `f` applied to it. Out of range indices leave the
    /// vector untouched.
    fn map_at<F: FnOnce(&T) -> T>(&self, idx: usize, f: F) -> Vector<T>;
}
impl<T: Clone> MapAtImmut<T> for Vector<T> {
    fn map_at<F: FnOnce(&T) -> T>(&self, idx: usize, f: F) -> Vector<T> {
        match self.get(idx) {
            Some(item) => self.update(idx, f(item)),
            None => self.clone(),
        }
    }
}
