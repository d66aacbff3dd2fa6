// Shorthand for return Err(ScanError::new(ErrorKind::Foo))
//
// Usage:
// - err!(Variant)          -> return Err(ScanError::new(ErrorKind::Variant))
// - err!(Variant(Inner))   -> return Err(ScanError::new(ErrorKind::Variant(Inner)))
macro_rules! err {
	($variant:ident) => {
		return Err(crate::error::ScanError::new(
			crate::error::ErrorKind::$variant,
		))
	};
	($variant:ident($inner:expr)) => {
		return Err(crate::error::ScanError::new(
			crate::error::ErrorKind::$variant($inner),
		))
	};
}

pub(crate) use err;
