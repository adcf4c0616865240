//! Type helpers for embedded field detection.

/// The single type argument of `Wrapper<T>` when the last path segment is `wrapper`.
fn single_arg<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    if args.args.len() != 1 {
        return None;
    }
    let syn::GenericArgument::Type(inner) = args.args.first()? else {
        return None;
    };
    Some(inner)
}

/// Extract the inner type T from Option<T>, or return None if not an Option type.
pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_arg(ty, "Option")
}

/// Extract the inner type T from Box<T>, or return None if not a Box type.
pub fn box_inner(ty: &syn::Type) -> Option<&syn::Type> {
    single_arg(ty, "Box")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_option_and_box() {
        let ty: syn::Type = syn::parse_quote!(Option<Box<Extra>>);
        let inner = box_inner(option_inner(&ty).unwrap()).unwrap();
        assert_eq!(quote::quote!(#inner).to_string(), "Extra");

        let plain: syn::Type = syn::parse_quote!(Audit);
        assert!(option_inner(&plain).is_none());
        assert!(box_inner(&plain).is_none());
    }
}
