use quote::ToTokens;
use syn::{GenericArgument, PathArguments, Type};

/// 返回类型的分类（与 `eventhandler_core::ReturnType` 对应）
pub(crate) enum ReturnKind {
    Unit,
    Fallible,
    Value(String),
}

pub(crate) fn classify_return(output: &syn::ReturnType) -> ReturnKind {
    match output {
        syn::ReturnType::Default => ReturnKind::Unit,
        syn::ReturnType::Type(_, ty) if is_unit(ty) => ReturnKind::Unit,
        syn::ReturnType::Type(_, ty) if is_unit_result(ty) => ReturnKind::Fallible,
        syn::ReturnType::Type(_, ty) => ReturnKind::Value(type_string(ty)),
    }
}

pub(crate) fn is_unit(ty: &Type) -> bool {
    match ty {
        Type::Tuple(t) => t.elems.is_empty(),
        Type::Paren(p) => is_unit(&p.elem),
        _ => false,
    }
}

// 形如 `Result<(), E>` / `anyhow::Result<()>` / `io::Result<()>`，以及 `XxxResult<()>` 别名；
// 不带参数的 `fmt::Result` 之类别名同样视为可失败，是否满足 `HandlerReturn` 交由类型检查判断
pub(crate) fn is_unit_result(ty: &Type) -> bool {
    let Type::Path(tp) = ty else {
        return false;
    };
    let Some(last) = tp.path.segments.last() else {
        return false;
    };
    if !last.ident.to_string().ends_with("Result") {
        return false;
    }
    match &last.arguments {
        PathArguments::None => true,
        PathArguments::AngleBracketed(args) => {
            matches!(args.args.first(), Some(GenericArgument::Type(first)) if is_unit(first))
        }
        PathArguments::Parenthesized(_) => false,
    }
}

pub(crate) fn is_reference(ty: &Type) -> bool {
    match ty {
        Type::Reference(_) => true,
        Type::Paren(p) => is_reference(&p.elem),
        _ => false,
    }
}

pub(crate) fn is_impl_trait(ty: &Type) -> bool {
    matches!(ty, Type::ImplTrait(_))
}

// 去掉 `quote` 输出中的多余空格，便于错误信息阅读
pub(crate) fn type_string(ty: &Type) -> String {
    ty.to_token_stream()
        .to_string()
        .replace(" < ", "<")
        .replace(" >", ">")
        .replace("< ", "<")
        .replace(" ,", ",")
        .replace(" :: ", "::")
        .replace("& ", "&")
}
