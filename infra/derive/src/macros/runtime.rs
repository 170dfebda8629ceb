use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, Ident, ItemFn, ReturnType, Type};

const PROFILES: [&str; 3] = ["high_performance", "memory_efficient", "default"];

/// Expands `#[expdj_runtime::main(profile)]` into a blocking `fn main`.
pub fn expand_main(args: TokenStream, input: ItemFn) -> TokenStream {
    if input.sig.asyncness.is_none() {
        return Error::new_spanned(&input.sig.ident, "#[expdj_runtime::main] requires an async fn")
            .to_compile_error();
    }
    if !returns_result(&input.sig.output) {
        return Error::new_spanned(
            &input.sig.output,
            "#[expdj_runtime::main] requires a Result return type",
        )
        .to_compile_error();
    }

    let profile = match parse_profile(args) {
        Ok(profile) => profile,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn { attrs, vis, sig, block } = input;
    let name = &sig.ident;
    let output = &sig.output;

    quote! {
        #(#attrs)*
        #vis fn #name() #output {
            let config = ::expdj_runtime::RuntimeConfig::#profile();
            let rt = ::expdj_runtime::build_runtime_with_config(&config)?;
            rt.block_on(async #block)
        }
    }
}

fn parse_profile(args: TokenStream) -> Result<Ident, Error> {
    if args.is_empty() {
        return Ok(Ident::new("default", proc_macro2::Span::call_site()));
    }

    let ident: Ident = syn::parse2(args)?;
    if PROFILES.iter().any(|p| ident == p) {
        Ok(ident)
    } else {
        Err(Error::new_spanned(
            &ident,
            format!("unknown runtime profile, expected one of: {}", PROFILES.join(", ")),
        ))
    }
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(path) = &**ty else {
        return false;
    };
    path.path.segments.last().is_some_and(|seg| seg.ident == "Result")
}
