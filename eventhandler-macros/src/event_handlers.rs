use crate::utils::{ReturnKind, classify_return, is_impl_trait, is_reference, type_string};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{
    Attribute, FnArg, ImplItem, ImplItemFn, Item, LitStr, PatType, Result, parse_macro_input,
};

#[derive(Clone, Copy)]
enum TagKind {
    Event,
    Broadcast,
}

impl TagKind {
    fn from_attr(attr: &Attribute) -> Option<Self> {
        if attr.path().is_ident("event") {
            Some(TagKind::Event)
        } else if attr.path().is_ident("broadcast") {
            Some(TagKind::Broadcast)
        } else {
            None
        }
    }

    fn tag_path(self) -> TokenStream2 {
        match self {
            TagKind::Event => quote! { ::eventhandler_core::EventTag },
            TagKind::Broadcast => quote! { ::eventhandler_core::BroadcastTag },
        }
    }
}

/// #[event_handlers] 宏实现
/// - 仅支持固有 `impl` 块
/// - 方法可标记 `#[event("name")]`（延迟队列）或 `#[broadcast("name")]`（订阅分发），可多次标记
/// - 为出现过的每种标记生成 `::eventhandler_core::Tagged<Tag>` 实现
/// - 类型化构造器无法表达的签名（有返回值、多个参数）以描述形式登记，由注册表在构建期拒绝
pub(crate) fn expand(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[event_handlers] takes no arguments",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as Item);

    let impl_item = match &mut input {
        Item::Impl(i) if i.trait_.is_none() => i,
        other => {
            return syn::Error::new(
                other.span(),
                "#[event_handlers] can only be used on inherent impl blocks",
            )
            .to_compile_error()
            .into();
        }
    };

    let mut event_entries: Vec<TokenStream2> = Vec::new();
    let mut broadcast_entries: Vec<TokenStream2> = Vec::new();

    for item in &mut impl_item.items {
        match item {
            ImplItem::Fn(f) => {
                let mut retained = Vec::new();
                let mut tags: Vec<(TagKind, LitStr)> = Vec::new();

                for attr in f.attrs.iter() {
                    match TagKind::from_attr(attr) {
                        Some(kind) => match attr.parse_args::<LitStr>() {
                            Ok(name) => tags.push((kind, name)),
                            Err(err) => {
                                return syn::Error::new(
                                    err.span(),
                                    "expected a string literal, e.g. #[event(\"user.created\")]",
                                )
                                .to_compile_error()
                                .into();
                            }
                        },
                        None => retained.push(attr.clone()),
                    }
                }

                f.attrs = retained;

                for (kind, name) in tags {
                    match method_entry(f, &name) {
                        Ok(entry) => match kind {
                            TagKind::Event => event_entries.push(entry),
                            TagKind::Broadcast => broadcast_entries.push(entry),
                        },
                        Err(err) => return err.to_compile_error().into(),
                    }
                }
            }
            other => {
                if let Some(attr) = item_attrs(other)
                    .iter()
                    .find(|a| TagKind::from_attr(a).is_some())
                {
                    return syn::Error::new(
                        attr.path().span(),
                        "#[event]/#[broadcast] can only be used on methods",
                    )
                    .to_compile_error()
                    .into();
                }
            }
        }
    }

    let self_ty = &impl_item.self_ty;
    let (impl_generics, _, where_clause) = impl_item.generics.split_for_impl();

    let impls = [
        (TagKind::Event, event_entries),
        (TagKind::Broadcast, broadcast_entries),
    ]
    .into_iter()
    .filter(|(_, entries)| !entries.is_empty())
    .map(|(kind, entries)| {
        let tag = kind.tag_path();
        quote! {
            impl #impl_generics ::eventhandler_core::Tagged<#tag> for #self_ty #where_clause {
                fn tagged_methods(
                    self: ::std::sync::Arc<Self>,
                ) -> ::std::vec::Vec<::eventhandler_core::TaggedMethod> {
                    ::std::vec![#(#entries),*]
                }
            }
        }
    })
    .collect::<Vec<_>>();

    let expanded = quote! {
        #input

        #(#impls)*
    };

    TokenStream::from(expanded)
}

fn item_attrs(item: &ImplItem) -> &[Attribute] {
    match item {
        ImplItem::Const(c) => &c.attrs,
        ImplItem::Type(t) => &t.attrs,
        ImplItem::Macro(m) => &m.attrs,
        _ => &[],
    }
}

// 为单个被标记方法生成 `TaggedMethod` 表达式
fn method_entry(f: &ImplItemFn, event: &LitStr) -> Result<TokenStream2> {
    let sig = &f.sig;
    let ident = &sig.ident;
    let method = LitStr::new(&ident.to_string(), ident.span());

    if sig.asyncness.is_some() {
        return Err(syn::Error::new(
            sig.asyncness.span(),
            "tagged methods must not be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            sig.generics.lt_token.span(),
            "tagged methods must not be generic",
        ));
    }

    // 有接收者时绑定到共享目标；否则视为关联函数
    let mut has_receiver = false;
    let mut params: Vec<&PatType> = Vec::new();
    for input in &sig.inputs {
        match input {
            FnArg::Receiver(r) => {
                if r.reference.is_none() || r.mutability.is_some() || r.colon_token.is_some() {
                    let span = match &r.mutability {
                        Some(m) => m.span(),
                        None => r.self_token.span(),
                    };
                    return Err(syn::Error::new(
                        span,
                        "tagged methods must take `&self` (or no receiver)",
                    ));
                }
                has_receiver = true;
            }
            FnArg::Typed(pt) => params.push(pt),
        }
    }

    let returns = classify_return(&sig.output);
    let typed = !matches!(returns, ReturnKind::Value(_)) && params.len() <= 1;

    if !typed {
        let returns = match returns {
            ReturnKind::Unit => quote! { ::eventhandler_core::ReturnType::Unit },
            ReturnKind::Fallible => quote! { ::eventhandler_core::ReturnType::Fallible },
            ReturnKind::Value(name) => quote! { ::eventhandler_core::ReturnType::Value(#name) },
        };
        let params = params.iter().map(|pt| {
            let ty = &*pt.ty;
            if is_impl_trait(ty) {
                let name = type_string(ty);
                quote! { ::eventhandler_core::ParamType::Object(#name) }
            } else {
                quote! { ::eventhandler_core::ParamType::named::<#ty>() }
            }
        });

        return Ok(quote! {
            ::eventhandler_core::TaggedMethod::describe(
                #event,
                ::eventhandler_core::MethodSignature::builder()
                    .method(#method)
                    .returns(#returns)
                    .params(::std::vec![#(#params),*])
                    .build(),
            )
        });
    }

    let callee = if has_receiver {
        quote! { target.#ident }
    } else {
        quote! { Self::#ident }
    };
    // 返回类型不满足 `HandlerReturn` 时，让错误落在用户写的返回类型上
    let check = match &sig.output {
        syn::ReturnType::Type(_, ty) => quote_spanned! { ty.span()=>
            let _ = <#ty as ::eventhandler_core::HandlerReturn>::return_type;
        },
        syn::ReturnType::Default => quote! {},
    };
    let bind = if has_receiver {
        quote! { let target = ::std::sync::Arc::clone(&self); }
    } else {
        quote! {}
    };

    let entry = match params.first() {
        None => quote! {
            ::eventhandler_core::TaggedMethod::nullary(#method, #event, move || #callee())
        },
        Some(pt) if is_reference(&pt.ty) || is_impl_trait(&pt.ty) => {
            return Err(syn::Error::new(
                pt.pat.span(),
                "tagged method parameters must be owned types",
            ));
        }
        Some(PatType { ty, .. }) => quote! {
            ::eventhandler_core::TaggedMethod::unary(#method, #event, move |arg: #ty| #callee(arg))
        },
    };

    Ok(quote! {
        {
            #check
            #bind
            #entry
        }
    })
}
