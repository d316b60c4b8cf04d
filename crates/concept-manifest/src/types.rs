//! Resolves source-level `TypeExpr` trees to `ResolvedType` trees, checking
//! every type-parameter reference against the concept's declared `typeParams`.

use concept_domain::{ManifestError, ResolvedType, TypeExpr};

pub fn resolve_type(ty: &TypeExpr, type_params: &[String]) -> Result<ResolvedType, ManifestError> {
    match ty {
        TypeExpr::Primitive(p) => Ok(ResolvedType::Primitive { wire: p.to_string() }),
        TypeExpr::Param(name) => {
            if type_params.iter().any(|p| p == name) {
                Ok(ResolvedType::Param { name: name.clone() })
            } else {
                Err(ManifestError::UnknownTypeParam(name.clone()))
            }
        }
        TypeExpr::Set(inner) => Ok(ResolvedType::Set { element: Box::new(resolve_type(inner, type_params)?) }),
        TypeExpr::List(inner) => Ok(ResolvedType::List { element: Box::new(resolve_type(inner, type_params)?) }),
        TypeExpr::Option(inner) => Ok(ResolvedType::Option { element: Box::new(resolve_type(inner, type_params)?) }),
        TypeExpr::Map(k, v) => {
            Ok(ResolvedType::Map { key: Box::new(resolve_type(k, type_params)?), value: Box::new(resolve_type(v, type_params)?) })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concept_domain::type_expr::Primitive;

    #[test]
    fn resolves_known_param() {
        let resolved = resolve_type(&TypeExpr::Param("M".into()), &["M".into()]).unwrap();
        assert_eq!(resolved, ResolvedType::Param { name: "M".into() });
    }

    #[test]
    fn rejects_unknown_param() {
        let err = resolve_type(&TypeExpr::Param("Z".into()), &["M".into()]).unwrap_err();
        assert_eq!(err, ManifestError::UnknownTypeParam("Z".into()));
    }

    #[test]
    fn resolves_nested_map() {
        let ty = TypeExpr::Map(Box::new(TypeExpr::Param("M".into())), Box::new(TypeExpr::Primitive(Primitive::String)));
        let resolved = resolve_type(&ty, &["M".into()]).unwrap();
        assert_eq!(
            resolved,
            ResolvedType::Map {
                key: Box::new(ResolvedType::Param { name: "M".into() }),
                value: Box::new(ResolvedType::Primitive { wire: "String".into() }),
            }
        );
    }
}
