//! Expression typing rules, one method per node shape.

use std::sync::Arc;

use kestrel_ast::{InfixOp, LiteralKind, NodeId, NodeKind, PostfixOp, PrefixOp};
use kestrel_common::module_graph::ModuleId;

use super::{Check, Checker};
use crate::constant::{LiteralError, Value};
use crate::error::{InternalError, TypeError};
use crate::symbol::Symbol;
use crate::ty::{FuncType, PrimitiveKind, Type};
use crate::type_info::TypedValue;

impl Checker<'_> {
    /// Dispatch on the node shape. Only [`Checker::typed_value_of`] calls
    /// this; everything else goes through the memo.
    pub(super) fn check_expr(&mut self, node: NodeId) -> Check<TypedValue> {
        let ast = Arc::clone(&self.ast);
        match ast.kind(node) {
            NodeKind::Empty => Ok(Some(TypedValue::new(Type::unit()))),
            NodeKind::Ident { name } => self.check_ident(node, name),
            NodeKind::Literal { kind, text } => self.check_literal(node, *kind, text),
            NodeKind::BuiltInCall { name, args } => self.check_builtin_call(node, *name, *args),
            NodeKind::Call { callee, args } => self.check_call(*callee, *args),
            NodeKind::Index { operand, args } => self.check_index(*operand, *args),
            NodeKind::Member { operand, member } => self.check_member(*operand, *member),
            NodeKind::ArrayType { args, elem } => self.check_array_type(*args, *elem),
            NodeKind::Signature {
                params,
                variadic,
                result,
            } => self.check_signature(*params, *variadic, *result),
            NodeKind::Param { ty, .. } => {
                Ok(self.type_expr(*ty)?.map(|ty| TypedValue::new(Type::type_desc(ty))))
            }
            NodeKind::Prefix { op, operand } => self.check_prefix(node, *op, *operand),
            NodeKind::Infix { op, lhs, rhs } => self.check_infix(node, *op, *lhs, *rhs),
            NodeKind::Postfix { op, operand } => self.check_postfix(*op, *operand),
            NodeKind::BracketList(items) => self.check_bracket_list(items),
            NodeKind::ParenList(items) => self.check_paren_list(items),
            NodeKind::CurlyList(items) => self.check_block(items),
            NodeKind::If {
                cond,
                body,
                else_branch,
            } => self.check_if(*cond, *body, *else_branch),
            NodeKind::While { cond, body } => self.check_while(*cond, *body),
            NodeKind::Decl(_)
            | NodeKind::Bad
            | NodeKind::Else { .. }
            | NodeKind::List(_)
            | NodeKind::ExprList(_)
            | NodeKind::AttributeList(_) => Err(self.ill_formed(node)),
        }
    }

    // ── Names and literals ─────────────────────────────────────────────

    fn check_ident(&mut self, node: NodeId, name: &str) -> Check<TypedValue> {
        let Some(symbol) = self.module.scopes.lookup(self.scope, name).cloned() else {
            self.error(TypeError::Undefined {
                name: name.to_string(),
                range: self.range(node),
            });
            return Ok(None);
        };
        self.module.info.record_use(node, Arc::clone(&symbol))?;

        match symbol.typed_value() {
            Some(typed) => Ok(Some(typed)),
            None => {
                self.error(TypeError::NoType {
                    name: name.to_string(),
                    range: self.range(node),
                });
                Ok(None)
            }
        }
    }

    fn check_literal(&mut self, node: NodeId, kind: LiteralKind, text: &str) -> Check<TypedValue> {
        match Value::from_literal(kind, text) {
            Ok(value) => Ok(Some(TypedValue::untyped(value))),
            Err(LiteralError::OutOfRange) => {
                self.error(TypeError::IntegerOutOfRange {
                    range: self.range(node),
                });
                Ok(None)
            }
            Err(LiteralError::Malformed) => Err(self.ill_formed(node)),
        }
    }

    // ── Calls ──────────────────────────────────────────────────────────

    /// Type each argument of a paren list. The list node itself records
    /// the tuple of argument types.
    fn check_arguments(&mut self, list: NodeId) -> Check<Vec<TypedValue>> {
        let ast = Arc::clone(&self.ast);
        let NodeKind::ParenList(items) = ast.kind(list) else {
            return Err(self.ill_formed(list));
        };

        let mut args = Vec::with_capacity(items.len());
        let mut ok = true;
        for &item in items {
            match self.typed_value_of(item)? {
                Some(typed) => args.push(typed),
                None => ok = false,
            }
        }

        if !ok {
            self.remember(list, None)?;
            return Ok(None);
        }
        let tuple = Type::Tuple(args.iter().map(|a| a.ty.clone()).collect());
        self.remember(list, Some(TypedValue::new(tuple)))?;
        Ok(Some(args))
    }

    /// Run the shared argument check, placing any error on the offending
    /// argument (or on the list when the argument does not exist).
    fn check_call_args(&mut self, func: &FuncType, list: NodeId, args: &[TypedValue]) -> bool {
        let types: Vec<Type> = args.iter().map(|a| a.ty.clone()).collect();
        match func.check_args(&types) {
            Ok(()) => true,
            Err(error) => {
                let target = match self.ast.kind(list) {
                    NodeKind::ParenList(items) => items.get(error.index).copied(),
                    _ => None,
                }
                .unwrap_or(list);
                self.error(TypeError::Args {
                    error,
                    range: self.range(target),
                });
                false
            }
        }
    }

    fn check_builtin_call(
        &mut self,
        node: NodeId,
        name: NodeId,
        args: NodeId,
    ) -> Check<TypedValue> {
        let builtin_name = self.ident_name(name)?;
        let Some(builtin) = self.cx.builtins.lookup(&builtin_name).cloned() else {
            self.error(TypeError::UnknownBuiltIn {
                name: builtin_name,
                range: self.range(name),
            });
            return Ok(None);
        };
        let symbol = Symbol::BuiltIn {
            name: builtin_name.clone(),
            ty: Type::func(builtin.ty.clone()),
        };
        self.module.info.record_use(name, Arc::new(symbol))?;

        match self.ast.kind(args) {
            NodeKind::ParenList(_) => {}
            NodeKind::CurlyList(_) => {
                self.error(TypeError::BlockBuiltInArgs {
                    range: self.range(args),
                });
                return Ok(None);
            }
            _ => return Err(self.ill_formed(args)),
        }

        let Some(arg_values) = self.check_arguments(args)? else {
            return Ok(None);
        };
        if !self.check_call_args(&builtin.ty, args, &arg_values) {
            return Ok(None);
        }

        match (builtin.eval)(&arg_values) {
            Ok(typed) => Ok(Some(typed)),
            Err(message) => {
                self.error(TypeError::BuiltInFailed {
                    name: builtin_name,
                    message,
                    range: self.range(node),
                });
                Ok(None)
            }
        }
    }

    fn check_call(&mut self, callee: NodeId, args: NodeId) -> Check<TypedValue> {
        let Some(callee_ty) = self.type_of(callee)? else {
            return Ok(None);
        };

        if let Some(func) = callee_ty.as_func().cloned() {
            let Some(arg_values) = self.check_arguments(args)? else {
                return Ok(None);
            };
            if !self.check_call_args(&func, args, &arg_values) {
                return Ok(None);
            }
            return Ok(Some(TypedValue::new(func.result_type())));
        }

        if callee_ty.is_type_desc() {
            let target = callee_ty.skip_type_desc();
            if let Some(shape) = target.as_struct() {
                let constructor = FuncType::new(
                    shape.fields.iter().map(|f| f.ty.clone()).collect(),
                    vec![target.clone()],
                );
                let Some(arg_values) = self.check_arguments(args)? else {
                    return Ok(None);
                };
                if !self.check_call_args(&constructor, args, &arg_values) {
                    return Ok(None);
                }
                return Ok(Some(TypedValue::new(target)));
            }
            if target.as_enum().is_some() {
                return Err(InternalError::Unimplemented {
                    what: "enum constructor call",
                });
            }
        }

        self.error(TypeError::NotAFunction {
            range: self.range(callee),
        });
        Ok(None)
    }

    // ── Indexing and members ───────────────────────────────────────────

    fn check_index(&mut self, operand: NodeId, args: NodeId) -> Check<TypedValue> {
        let Some(operand_ty) = self.type_of(operand)? else {
            return Ok(None);
        };
        let ast = Arc::clone(&self.ast);
        let NodeKind::BracketList(items) = ast.kind(args) else {
            return Err(self.ill_formed(args));
        };
        let [index] = items.as_slice() else {
            self.error(TypeError::ExpectedOneArgument {
                range: self.range(args),
            });
            return Ok(None);
        };
        let index = *index;

        if let Some(array) = operand_ty.as_array() {
            let Some(index_ty) = self.type_of(index)? else {
                return Ok(None);
            };
            if !index_ty.assignable_to(&Type::i32()) {
                self.error(TypeError::IndexNotI32 {
                    found: index_ty,
                    range: self.range(index),
                });
                return Ok(None);
            }
            return Ok(Some(TypedValue::new(array.elem.clone())));
        }

        if let Some(elems) = operand_ty.as_tuple() {
            let position = match ast.kind(index) {
                NodeKind::Literal {
                    kind: LiteralKind::Int,
                    text,
                } => Value::from_literal(LiteralKind::Int, text)
                    .ok()
                    .and_then(|v| v.as_int()),
                _ => {
                    self.error(TypeError::ExpectedIntegerLiteral {
                        range: self.range(index),
                    });
                    return Ok(None);
                }
            };
            // The literal is typed like any other so it shows up in the
            // type table.
            self.type_of(index)?;
            let slot = position
                .and_then(|p| usize::try_from(p).ok())
                .and_then(|p| elems.get(p));
            return match slot {
                Some(ty) => Ok(Some(TypedValue::new(ty.clone()))),
                None => {
                    self.error(TypeError::IndexOutOfRange {
                        len: elems.len(),
                        range: self.range(index),
                    });
                    Ok(None)
                }
            };
        }

        self.error(TypeError::NotIndexable {
            range: self.range(operand),
        });
        Ok(None)
    }

    fn check_member(&mut self, operand: NodeId, member: NodeId) -> Check<TypedValue> {
        let member_name = self.ident_name(member)?;

        if let Some(name) = self.ast.ident_name(operand) {
            let symbol = self.module.scopes.lookup(self.scope, name).cloned();
            if let Some(symbol) = symbol {
                if let Symbol::Module { id, name } = symbol.as_ref() {
                    self.module.info.record_use(operand, Arc::clone(&symbol))?;
                    return self.check_module_member(*id, name, member, &member_name);
                }
            }
        }

        let Some(operand_ty) = self.type_of(operand)? else {
            return Ok(None);
        };

        if operand_ty.is_type_desc() {
            let target = operand_ty.skip_type_desc();
            if let Some(shape) = target.as_enum() {
                if shape.has_variant(&member_name) {
                    return Ok(Some(TypedValue::new(target)));
                }
            }
            self.error(TypeError::NoMember {
                member: member_name,
                owner: target.to_string(),
                range: self.range(member),
            });
            return Ok(None);
        }

        let base = operand_ty.as_reference().cloned().unwrap_or_else(|| operand_ty.clone());
        if let Some(field) = base.as_struct().and_then(|s| s.field(&member_name)) {
            return Ok(Some(TypedValue::new(field.ty.clone())));
        }

        self.error(TypeError::NoMember {
            member: member_name,
            owner: operand_ty.to_string(),
            range: self.range(member),
        });
        Ok(None)
    }

    /// `m.x` where `m` names an imported module: `x` must be declared at
    /// the top level of `m`.
    fn check_module_member(
        &mut self,
        id: ModuleId,
        module_name: &str,
        member: NodeId,
        member_name: &str,
    ) -> Check<TypedValue> {
        let imported = self
            .cx
            .modules
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| InternalError::MissingModule {
                name: module_name.to_string(),
            })?;
        let found = imported
            .scopes
            .lookup_local(imported.top_scope(), member_name)
            .cloned();

        let Some(symbol) = found else {
            self.error(TypeError::NoMember {
                member: member_name.to_string(),
                owner: module_name.to_string(),
                range: self.range(member),
            });
            return Ok(None);
        };
        self.module.info.record_use(member, Arc::clone(&symbol))?;

        match symbol.typed_value() {
            Some(typed) => Ok(Some(typed)),
            None => {
                self.error(TypeError::NoType {
                    name: format!("{}.{}", module_name, member_name),
                    range: self.range(member),
                });
                Ok(None)
            }
        }
    }

    // ── Type expressions ───────────────────────────────────────────────

    fn check_array_type(&mut self, args: NodeId, elem: NodeId) -> Check<TypedValue> {
        let ast = Arc::clone(&self.ast);
        let NodeKind::BracketList(items) = ast.kind(args) else {
            return Err(self.ill_formed(args));
        };
        let size_node = match items.as_slice() {
            [] => {
                self.error(TypeError::SlicesNotImplemented {
                    range: self.range(args),
                });
                return Ok(None);
            }
            [size] => *size,
            _ => {
                self.error(TypeError::ExpectedOneArgument {
                    range: self.range(args),
                });
                return Ok(None);
            }
        };

        let Some(size) = self.typed_value_of(size_node)? else {
            return Ok(None);
        };
        let range = self.range(size_node);
        let size = match size.value {
            None => {
                self.error(TypeError::ArraySizeUnknown { range });
                return Ok(None);
            }
            Some(Value::Int(n)) => match u64::try_from(n) {
                Ok(n) if n <= i64::MAX as u64 => n,
                _ => {
                    self.error(TypeError::ArraySizeOutOfRange { range });
                    return Ok(None);
                }
            },
            Some(_) => {
                self.error(TypeError::ArraySizeNotInteger { range });
                return Ok(None);
            }
        };

        let Some(elem_ty) = self.type_expr(elem)? else {
            return Ok(None);
        };
        Ok(Some(TypedValue::new(Type::type_desc(Type::array(size, elem_ty)))))
    }

    fn check_signature(
        &mut self,
        params: NodeId,
        variadic: Option<NodeId>,
        result: Option<NodeId>,
    ) -> Check<TypedValue> {
        let Some(param_list) = self.type_of(params)? else {
            return Ok(None);
        };
        let param_types = if param_list.equals(&Type::unit()) {
            Vec::new()
        } else if param_list.is_type_desc() {
            Type::wrap_in_tuple(param_list.skip_type_desc())
        } else {
            self.error(TypeError::ExpectedType {
                found: param_list,
                range: self.range(params),
            });
            return Ok(None);
        };

        let variadic_ty = match variadic {
            Some(node) => match self.type_expr(node)? {
                Some(ty) => Some(ty),
                None => return Ok(None),
            },
            None => None,
        };

        let result_types = match result {
            Some(node) => match self.type_expr(node)? {
                Some(ty) => Type::wrap_in_tuple(ty),
                None => return Ok(None),
            },
            None => Vec::new(),
        };

        let mut func = FuncType::new(param_types, result_types);
        if let Some(variadic_ty) = variadic_ty {
            func = func.with_variadic(variadic_ty);
        }
        Ok(Some(TypedValue::new(Type::type_desc(Type::func(func)))))
    }

    // ── Operators ──────────────────────────────────────────────────────

    fn check_prefix(&mut self, node: NodeId, op: PrefixOp, operand: NodeId) -> Check<TypedValue> {
        let Some(typed) = self.typed_value_of(operand)? else {
            return Ok(None);
        };

        match op {
            PrefixOp::Neg => {
                use PrimitiveKind::{UntypedFloat, UntypedInt, F64, I32};
                if matches!(
                    typed.ty.as_primitive(),
                    Some(UntypedInt | UntypedFloat | I32 | F64)
                ) {
                    let value = typed.value.as_ref().and_then(Value::negate);
                    return Ok(Some(TypedValue {
                        ty: typed.ty,
                        value,
                    }));
                }
            }
            PrefixOp::Not => {
                use PrimitiveKind::{Bool, UntypedBool};
                if matches!(typed.ty.as_primitive(), Some(UntypedBool | Bool)) {
                    return Ok(Some(TypedValue::new(typed.ty)));
                }
            }
            PrefixOp::Addr => {
                let ty = if typed.ty.is_type_desc() {
                    Type::type_desc(Type::reference(typed.ty.skip_type_desc()))
                } else {
                    Type::reference(typed.ty.skip_untyped())
                };
                return Ok(Some(TypedValue::new(ty)));
            }
            PrefixOp::MutAddr => {
                return Err(InternalError::Unimplemented {
                    what: "mutable address-of",
                })
            }
        }

        self.error(TypeError::OperatorUndefined {
            op: op.to_string(),
            ty: typed.ty,
            range: self.range(node),
        });
        Ok(None)
    }

    fn check_infix(
        &mut self,
        node: NodeId,
        op: InfixOp,
        lhs: NodeId,
        rhs: NodeId,
    ) -> Check<TypedValue> {
        let lhs_ty = self.type_of(lhs)?;
        let rhs_ty = self.type_of(rhs)?;
        let (Some(mut lhs_ty), Some(mut rhs_ty)) = (lhs_ty, rhs_ty) else {
            return Ok(None);
        };

        // An untyped side takes the concrete type of the other side.
        if lhs_ty.is_untyped() && !rhs_ty.is_untyped() && lhs_ty.assignable_to(&rhs_ty) {
            lhs_ty = rhs_ty.clone();
        } else if rhs_ty.is_untyped() && !lhs_ty.is_untyped() && rhs_ty.assignable_to(&lhs_ty) {
            rhs_ty = lhs_ty.clone();
        }

        if !lhs_ty.equals(&rhs_ty) {
            self.error(TypeError::OperandMismatch {
                lhs: lhs_ty,
                rhs: rhs_ty,
                range: self.range(node),
            });
            return Ok(None);
        }

        if op == InfixOp::Assign {
            return Ok(Some(TypedValue::new(Type::unit())));
        }

        use PrimitiveKind::{Bool, UntypedBool, UntypedFloat, UntypedInt, F64, I32};
        let kind = lhs_ty.as_primitive();
        let result = if op.is_arithmetic() {
            match kind {
                Some(UntypedInt | UntypedFloat | I32 | F64) => Some(lhs_ty.clone()),
                _ => None,
            }
        } else if op.is_comparison() {
            match kind {
                Some(UntypedBool | UntypedInt | UntypedFloat) => Some(Type::primitive(UntypedBool)),
                Some(Bool | I32 | F64) => Some(Type::bool()),
                _ => None,
            }
        } else {
            None
        };

        match result {
            Some(ty) => Ok(Some(TypedValue::new(ty))),
            None => {
                self.error(TypeError::OperatorUndefined {
                    op: op.to_string(),
                    ty: lhs_ty,
                    range: self.range(node),
                });
                Ok(None)
            }
        }
    }

    fn check_postfix(&mut self, op: PostfixOp, operand: NodeId) -> Check<TypedValue> {
        let Some(operand_ty) = self.type_of(operand)? else {
            return Ok(None);
        };
        match op {
            PostfixOp::Unwrap => match operand_ty.as_reference() {
                Some(base) => Ok(Some(TypedValue::new(base.clone()))),
                None => {
                    self.error(TypeError::NotAReference {
                        range: self.range(operand),
                    });
                    Ok(None)
                }
            },
            PostfixOp::Try => Err(InternalError::Unimplemented {
                what: "try operator",
            }),
        }
    }

    // ── Lists ──────────────────────────────────────────────────────────

    fn check_bracket_list(&mut self, items: &[NodeId]) -> Check<TypedValue> {
        let mut elem: Option<Type> = None;
        let mut ok = true;

        for &item in items {
            let Some(ty) = self.type_of(item)? else {
                ok = false;
                continue;
            };
            match &elem {
                None => elem = Some(ty.skip_untyped()),
                Some(expected) if !ty.assignable_to(expected) => {
                    self.error(TypeError::ElementMismatch {
                        expected: expected.clone(),
                        found: ty,
                        range: self.range(item),
                    });
                    ok = false;
                }
                Some(_) => {}
            }
        }

        if !ok {
            return Ok(None);
        }
        let elem = elem.unwrap_or_else(Type::unit);
        Ok(Some(TypedValue::new(Type::array(items.len() as u64, elem))))
    }

    fn check_paren_list(&mut self, items: &[NodeId]) -> Check<TypedValue> {
        let Some((&first, rest)) = items.split_first() else {
            return Ok(Some(TypedValue::new(Type::unit())));
        };
        let Some(first_typed) = self.typed_value_of(first)? else {
            return Ok(None);
        };

        if first_typed.ty.is_type_desc() {
            let mut elems = vec![first_typed.ty.skip_type_desc()];
            let mut ok = true;
            for &item in rest {
                match self.type_expr(item)? {
                    Some(ty) => elems.push(ty),
                    None => ok = false,
                }
            }
            return Ok(ok.then(|| TypedValue::new(Type::type_desc(Type::Tuple(elems)))));
        }

        // A parenthesized single value is just that value.
        if rest.is_empty() {
            return Ok(Some(first_typed));
        }

        let mut elems = vec![first_typed.ty];
        let mut ok = true;
        for &item in rest {
            match self.value_expr(item)? {
                Some(typed) => elems.push(typed.ty),
                None => ok = false,
            }
        }
        Ok(ok.then(|| TypedValue::new(Type::Tuple(elems))))
    }

    /// A block: members are visited in a new scope. Declarations are
    /// resolved as they come; the block types as its trailing expression.
    fn check_block(&mut self, items: &[NodeId]) -> Check<TypedValue> {
        let ast = Arc::clone(&self.ast);
        self.with_scope(|this| -> Check<TypedValue> {
            let mut last = Some(Type::unit());
            for &item in items {
                match ast.kind(item) {
                    NodeKind::Decl(decl) => {
                        this.resolve_decl(item, decl)?;
                        last = Some(Type::unit());
                    }
                    _ => last = this.type_of(item)?,
                }
            }
            Ok(last.map(TypedValue::new))
        })
    }

    // ── Control flow ───────────────────────────────────────────────────

    fn check_if(
        &mut self,
        cond: NodeId,
        body: NodeId,
        else_branch: Option<NodeId>,
    ) -> Check<TypedValue> {
        let Some(body_ty) = self.type_of(body)? else {
            return Ok(None);
        };
        let mut result = body_ty.clone();

        if let Some(else_node) = else_branch {
            let ast = Arc::clone(&self.ast);
            let NodeKind::Else { body: else_body } = ast.kind(else_node) else {
                return Err(self.ill_formed(else_node));
            };
            if let Some(else_ty) = self.type_of(*else_body)? {
                let widens = body_ty.assignable_to(&else_ty);
                let narrows = else_ty.assignable_to(&body_ty);
                if !widens && !narrows {
                    let target = self.last_member(*else_body);
                    self.error(TypeError::BranchMismatch {
                        expected: body_ty,
                        found: else_ty,
                        range: self.range(target),
                    });
                } else if widens && !narrows {
                    // An untyped body takes the else branch's concrete type.
                    result = else_ty;
                }
            }
        }

        self.check_condition(cond)?;
        Ok(Some(TypedValue::new(result)))
    }

    fn check_while(&mut self, cond: NodeId, body: NodeId) -> Check<TypedValue> {
        if let Some(body_ty) = self.type_of(body)? {
            if !body_ty.equals(&Type::unit()) {
                self.error(TypeError::WhileBodyNotUnit {
                    found: body_ty,
                    range: self.range(body),
                });
            }
        }
        self.check_condition(cond)?;
        Ok(Some(TypedValue::new(Type::unit())))
    }

    fn check_condition(&mut self, cond: NodeId) -> Result<(), InternalError> {
        if let Some(cond_ty) = self.type_of(cond)? {
            if !cond_ty.assignable_to(&Type::bool()) {
                self.error(TypeError::ConditionNotBool {
                    found: cond_ty,
                    range: self.range(cond),
                });
            }
        }
        Ok(())
    }

    /// The node an else-branch mismatch points at: the last member of the
    /// block, looking through a nested `if` to its body.
    pub(super) fn last_member(&self, node: NodeId) -> NodeId {
        match self.ast.kind(node) {
            NodeKind::CurlyList(items) => items.last().copied().unwrap_or(node),
            NodeKind::If { body, .. } => self.last_member(*body),
            _ => node,
        }
    }
}
