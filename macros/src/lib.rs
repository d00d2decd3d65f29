use proc_macro::TokenStream;

use quote::quote;
use syn::{parse_macro_input, ItemFn};

/// Runs the function body as the root goroutine and blocks until it returns.
///
/// A panic inside the body is re-raised on the calling thread.
#[proc_macro_attribute]
pub fn start(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let item = parse_macro_input!(item as ItemFn);

    if !item.sig.inputs.is_empty() {
        return syn::Error::new_spanned(&item.sig.inputs, "#[gochan::start] functions take no arguments")
            .to_compile_error()
            .into();
    }

    let attributes = &item.attrs;
    let visibility = &item.vis;
    let signature = &item.sig;
    let body = &item.block;

    let result = quote! {
        #(#attributes)*
        #visibility #signature {
            match ::gochan::runtime::start(move || #body) {
                Ok(output) => output,
                Err(payload) => ::std::panic::resume_unwind(payload),
            }
        }
    };

    result.into()
}
