#[macro_export]
macro_rules! tvec {
    // count helper: transform any expression into 1
    (@one $x:expr) => (1usize);
    ($elem:expr; $n:expr) => ({
        $crate::TVec::from_elem($elem, $n)
    });
    ($($x:expr),*$(,)*) => ({
        let count = 0usize $(+ tvec!(@one $x))*;
        #[allow(unused_mut)]
        let mut vec = $crate::TVec::new();
        if count <= vec.inline_size() {
            $(vec.push($x);)*
            vec
        } else {
            $crate::TVec::from_vec(vec![$($x,)*])
        }
    });
}

/// Early return with a `ResolutionError` variant, the way `anyhow::bail!`
/// works for untyped errors.
#[macro_export]
macro_rules! fail {
    ($variant:ident, $($arg:tt)*) => {
        return Err($crate::errors::ResolutionError::$variant(format!($($arg)*)))
    };
}
