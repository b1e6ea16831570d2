mod imports;
use crate::imports::*;
mod approx_eq_derive;

/// Derives `ApproxEq` for a struct with named fields by requiring every
/// field to be approximately equal within the provided tolerance.
#[proc_macro_error]
#[proc_macro_derive(ApproxEq)]
pub fn approx_eq_derive(input: TokenStream) -> TokenStream {
    approx_eq_derive::approx_eq_derive(input)
}
