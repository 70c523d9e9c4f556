//! Declaration resolution: binding names in the current scope.

use std::sync::Arc;

use kestrel_ast::{Decl, NodeId, NodeKind};
use tracing::{debug, trace};

use super::Checker;
use crate::error::{InternalError, TypeError};
use crate::symbol::Symbol;
use crate::ty::{EnumType, Field, Named, StructType, Type};
use crate::type_info::TypedValue;

impl Checker<'_> {
    pub(crate) fn resolve_decl(&mut self, node: NodeId, decl: &Decl) -> Result<(), InternalError> {
        trace!(keyword = decl.keyword(), node = node.0, "resolve declaration");
        match decl {
            Decl::Var { name, ty, value } => self.resolve_var(node, *name, *ty, *value),
            Decl::Const { name, ty, value } => self.resolve_const(node, *name, *ty, *value),
            Decl::Func {
                name,
                signature,
                body,
            } => self.resolve_func(node, *name, *signature, *body),
            Decl::Struct { name, fields } => self.resolve_struct(node, *name, fields),
            Decl::Enum { name, variants } => self.resolve_enum(node, *name, variants),
            Decl::Import { name } => self.resolve_import(*name),
        }
    }

    /// Bind `symbol` in the current scope and record its definition.
    /// A name already bound in this scope is reported along with a note at
    /// the earlier declaration.
    fn bind(&mut self, ident: NodeId, symbol: Symbol) -> Result<(), InternalError> {
        let symbol = Arc::new(symbol);
        trace!(
            name = symbol.name(),
            kind = symbol.describe(),
            scope = self.scope.0,
            "declare"
        );

        if let Err(previous) = self.module.scopes.define(self.scope, Arc::clone(&symbol)) {
            let name = symbol.name().to_string();
            self.error(TypeError::Redeclared {
                name: name.clone(),
                range: self.range(ident),
            });
            if let Some(prev_ident) = previous.ident() {
                self.error(TypeError::PreviousDeclaration {
                    name,
                    range: self.range(prev_ident),
                });
            }
        }
        self.module.info.record_def(ident, symbol)
    }

    /// The type named by an optional annotation. `Ok(Err(()))` means the
    /// annotation was present but did not check.
    fn annotation(
        &mut self,
        ty: Option<NodeId>,
    ) -> Result<Result<Option<Type>, ()>, InternalError> {
        match ty {
            None => Ok(Ok(None)),
            Some(node) => Ok(self.type_expr(node)?.map(Some).ok_or(())),
        }
    }

    fn resolve_var(
        &mut self,
        node: NodeId,
        name: NodeId,
        ty: Option<NodeId>,
        value: Option<NodeId>,
    ) -> Result<(), InternalError> {
        let var_name = self.ident_name(name)?;
        let annotated = self.annotation(ty)?;
        let initial = match value {
            Some(value) => Some(self.value_expr(value)?),
            None => None,
        };

        let resolved = match (annotated, initial) {
            (Ok(None), None) => {
                self.error(TypeError::MissingTypeOrValue {
                    name: var_name.clone(),
                    range: self.range(name),
                });
                None
            }
            (Ok(Some(declared)), None) => Some(declared),
            (Ok(None), Some(Some(typed))) => Some(typed.ty.skip_untyped()),
            (Ok(Some(declared)), Some(Some(typed))) => {
                self.expect_assignable(&typed.ty, &declared, value)
                    .then_some(declared)
            }
            _ => None,
        };

        self.bind(
            name,
            Symbol::Var {
                name: var_name,
                ty: resolved,
                owner: self.scope,
                ident: name,
                node,
            },
        )
    }

    fn resolve_const(
        &mut self,
        node: NodeId,
        name: NodeId,
        ty: Option<NodeId>,
        value: NodeId,
    ) -> Result<(), InternalError> {
        let const_name = self.ident_name(name)?;
        let annotated = self.annotation(ty)?;
        let initial = self.value_expr(value)?;

        let typed = match (annotated, initial) {
            (Ok(declared), Some(typed)) => match typed.value {
                None => {
                    self.error(TypeError::NotConstant {
                        name: const_name.clone(),
                        range: self.range(value),
                    });
                    None
                }
                Some(folded) => match declared {
                    Some(declared) => self
                        .expect_assignable(&typed.ty, &declared, Some(value))
                        .then(|| TypedValue::constant(declared, folded)),
                    None => Some(TypedValue::constant(typed.ty.skip_untyped(), folded)),
                },
            },
            _ => None,
        };

        self.bind(
            name,
            Symbol::Const {
                name: const_name,
                typed,
                owner: self.scope,
                ident: Some(name),
                node: Some(node),
            },
        )
    }

    fn resolve_func(
        &mut self,
        node: NodeId,
        name: NodeId,
        signature: NodeId,
        body: Option<NodeId>,
    ) -> Result<(), InternalError> {
        let func_name = self.ident_name(name)?;
        let func_ty = self.type_expr(signature)?;

        // Bound before the body so the function can call itself.
        self.bind(
            name,
            Symbol::Func {
                name: func_name,
                ty: func_ty.clone(),
                owner: self.scope,
                ident: name,
                node,
            },
        )?;

        let Some(body) = body else {
            return Ok(());
        };
        let params = self.signature_params(signature)?;
        self.with_scope(|this| -> Result<(), InternalError> {
            for param in params {
                this.bind_param(param)?;
            }
            let Some(body_ty) = this.type_of(body)? else {
                return Ok(());
            };
            let Some(func) = func_ty.as_ref().and_then(Type::as_func) else {
                return Ok(());
            };
            let returned = Type::Tuple(Type::wrap_in_tuple(body_ty.clone()));
            if !returned.assignable_to(&Type::Tuple(func.result.clone())) {
                let target = this.last_member(body);
                this.error(TypeError::Mismatch {
                    expected: func.result_type(),
                    found: body_ty,
                    range: this.range(target),
                });
            }
            Ok(())
        })
    }

    fn signature_params(&self, signature: NodeId) -> Result<Vec<NodeId>, InternalError> {
        let NodeKind::Signature { params, .. } = self.ast.kind(signature) else {
            return Err(self.ill_formed(signature));
        };
        match self.ast.kind(*params) {
            NodeKind::ParenList(items) => Ok(items.clone()),
            _ => Err(self.ill_formed(*params)),
        }
    }

    /// Bind a parameter as a variable of its annotated type. The parameter
    /// node was typed while checking the signature.
    fn bind_param(&mut self, param: NodeId) -> Result<(), InternalError> {
        let NodeKind::Param { name, .. } = self.ast.kind(param) else {
            return Err(self.ill_formed(param));
        };
        let name = *name;
        let param_name = self.ident_name(name)?;
        let ty = self
            .module
            .info
            .type_of(param)
            .map(Type::skip_type_desc);
        self.bind(
            name,
            Symbol::Var {
                name: param_name,
                ty,
                owner: self.scope,
                ident: name,
                node: param,
            },
        )
    }

    fn resolve_struct(
        &mut self,
        node: NodeId,
        name: NodeId,
        fields: &[NodeId],
    ) -> Result<(), InternalError> {
        let struct_name = self.ident_name(name)?;
        let mut resolved: Vec<Field> = Vec::with_capacity(fields.len());
        let mut ok = true;

        for &field in fields {
            let NodeKind::Param { name: field_ident, .. } = self.ast.kind(field) else {
                return Err(self.ill_formed(field));
            };
            let field_ident = *field_ident;
            let field_name = self.ident_name(field_ident)?;
            let field_ty = self.type_of(field)?;

            if resolved.iter().any(|f| f.name == field_name) {
                self.error(TypeError::DuplicateField {
                    name: field_name,
                    range: self.range(field_ident),
                });
                ok = false;
                continue;
            }
            match field_ty {
                Some(ty) => resolved.push(Field {
                    name: field_name,
                    ty: ty.skip_type_desc(),
                }),
                None => ok = false,
            }
        }

        let ty = ok.then(|| {
            let shape = Type::Struct(StructType { fields: resolved });
            Type::type_desc(Type::Named(Named::new(struct_name.clone(), shape, Some(node))))
        });
        self.bind_type(node, name, struct_name, ty)
    }

    fn resolve_enum(
        &mut self,
        node: NodeId,
        name: NodeId,
        variants: &[NodeId],
    ) -> Result<(), InternalError> {
        let enum_name = self.ident_name(name)?;
        let mut names: Vec<String> = Vec::with_capacity(variants.len());
        let mut ok = true;

        for &variant in variants {
            let variant_name = self.ident_name(variant)?;
            if names.contains(&variant_name) {
                self.error(TypeError::DuplicateVariant {
                    name: variant_name,
                    range: self.range(variant),
                });
                ok = false;
                continue;
            }
            names.push(variant_name);
        }

        let ty = ok.then(|| {
            let shape = Type::Enum(EnumType { variants: names });
            Type::type_desc(Type::Named(Named::new(enum_name.clone(), shape, Some(node))))
        });
        self.bind_type(node, name, enum_name, ty)
    }

    fn bind_type(
        &mut self,
        node: NodeId,
        ident: NodeId,
        name: String,
        ty: Option<Type>,
    ) -> Result<(), InternalError> {
        self.bind(
            ident,
            Symbol::TypeName {
                name,
                ty,
                owner: self.scope,
                ident: Some(ident),
                node: Some(node),
            },
        )
    }

    /// `import name`: the module must already be checked, and must not
    /// import this module back.
    fn resolve_import(&mut self, name: NodeId) -> Result<(), InternalError> {
        let module_name = self.ident_name(name)?;
        let Some(id) = self.cx.graph.resolve(&module_name) else {
            self.error(TypeError::UnknownModule {
                name: module_name,
                range: self.range(name),
            });
            return Ok(());
        };

        let completed = self
            .cx
            .modules
            .get(id.index())
            .and_then(Option::as_ref)
            .is_some_and(|m| m.is_completed());
        let on_cycle = self
            .cx
            .cycles
            .iter()
            .find(|c| c.involves(self.module.name()) && c.involves(&module_name));
        if !completed || on_cycle.is_some() {
            let cycle = match on_cycle {
                Some(cycle) => cycle.to_string(),
                None => format!("{} -> {}", self.module.name(), module_name),
            };
            debug!(module = self.module.name(), %cycle, "import cycle rejected");
            self.error(TypeError::ImportCycle {
                cycle,
                range: self.range(name),
            });
            return Ok(());
        }

        if !self.module.imports.contains(&id) {
            self.module.imports.push(id);
        }
        self.bind(
            name,
            Symbol::Module {
                id,
                name: module_name,
            },
        )
    }

    /// Report `found` not fitting `expected` at `node`. Returns whether it
    /// fits.
    fn expect_assignable(&mut self, found: &Type, expected: &Type, node: Option<NodeId>) -> bool {
        if found.assignable_to(expected) {
            return true;
        }
        if let Some(node) = node {
            self.error(TypeError::Mismatch {
                expected: expected.clone(),
                found: found.clone(),
                range: self.range(node),
            });
        }
        false
    }
}
