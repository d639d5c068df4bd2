use std::ops::Deref;
use std::str::FromStr;

use smallvec::SmallVec;

/// Path variables captured by a matched rule, in pattern order.
#[derive(Debug, Clone)]
pub struct Captures<'a> {
    pub(crate) buf: SmallVec<[(&'a str, &'a str); 8]>,
}

impl<'a> Captures<'a> {
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.buf
            .iter()
            .find_map(|&(k, v)| if name == k { Some(v) } else { None })
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(T::from_str)
    }
}

impl<'a> Deref for Captures<'a> {
    type Target = [(&'a str, &'a str)];
    fn deref(&self) -> &Self::Target {
        &*self.buf
    }
}

impl Captures<'_> {
    pub(crate) fn new() -> Self {
        Self {
            buf: SmallVec::new(),
        }
    }
}
