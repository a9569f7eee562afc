//! Recursive-descent parser — 4.E
//!
//! A hand-written parser driven by a cursor into the token slice
//! produced by [`crate::token::tokenize`]. Each production is a method
//! that advances `self.pos` and returns a [`Node`] (or a [`Ty`]);
//! AST-node type annotation happens inside the `ast::new_*`
//! constructors as each node is built, so by the time a production
//! returns, every expression it produced already satisfies "every
//! expression node has a non-null type".
//!
//! Grammar (design-level, matches spec.md exactly):
//!
//! ```text
//! program      ::= (typedef | function_def | global_var)*
//! declspec     ::= storage-class* type-specifier+
//! declarator   ::= "*"* ("(" declarator ")" | ident) type_suffix
//! type_suffix  ::= "(" func_params | "[" number "]" type_suffix | ε
//! compound     ::= (typedef | declaration | stmt)*  "}"
//! stmt         ::= return | if | for | while | "{" compound | expr_stmt
//! expr         ::= assign ("," expr)?
//! assign       ::= equality ("=" assign)?
//! equality     ::= relational (("==" | "!=") relational)*
//! relational   ::= add (("<" | "<=" | ">" | ">=") add)*
//! add          ::= mul (("+" | "-") mul)*
//! mul          ::= cast (("*" | "/") cast)*
//! cast         ::= "(" type_name ")" cast | unary
//! unary        ::= ("+"|"-"|"*"|"&") cast | postfix
//! postfix      ::= primary ("[" expr "]" | "." ident | "->" ident)*
//! primary      ::= "(" "{" stmt+ "}" ")" | "(" expr ")" | "sizeof" (...)
//!               |  ident ( "(" arg_list? ")" )? | string_literal | number
//! ```

use crate::ast::{self, Node, NodeKind, Span};
use crate::diagnostics::CompileError;
use crate::scope::{Binding, Scopes};
use crate::symbol::{Object, SymbolRef};
use crate::token::{Token, TokenKind};
use crate::ty::{self, Ty, TypeKind};

const TYPE_KEYWORDS: &[&str] = &["void", "char", "short", "int", "long", "struct", "union"];

/// The result of parsing a declarator: the bound name (absent for
/// abstract declarators, e.g. in `sizeof(int*)`), its elaborated type,
/// and — only when a function's parameter list was parsed along the
/// way — each parameter's name token, in order.
struct Declared {
    name: Option<Token>,
    ty: Ty,
    param_names: Vec<Option<Token>>,
}

pub struct Parser<'a> {
    src: &'a str,
    toks: &'a [Token],
    pos: usize,
    scopes: Scopes,
    globals: Vec<SymbolRef>,
    cur_locals: Vec<SymbolRef>,
    cur_fn_ret_ty: Option<Ty>,
    anon_count: u32,
}

/// Parse a full translation unit, returning every top-level symbol
/// (functions and globals) in declaration order.
pub fn parse(src: &str, toks: &[Token]) -> Result<Vec<SymbolRef>, CompileError> {
    let mut p = Parser::new(src, toks);
    p.program()?;
    Ok(p.globals)
}

impl<'a> Parser<'a> {
    fn new(src: &'a str, toks: &'a [Token]) -> Self {
        Parser {
            src,
            toks,
            pos: 0,
            scopes: Scopes::new(),
            globals: Vec::new(),
            cur_locals: Vec::new(),
            cur_fn_ret_ty: None,
            anon_count: 0,
        }
    }

    // --- token-stream helpers ---

    fn cur(&self) -> &Token {
        &self.toks[self.pos]
    }

    fn peek(&self) -> Token {
        self.cur().clone()
    }

    fn at_eof(&self) -> bool {
        self.cur().is_eof()
    }

    fn bump(&mut self) -> Token {
        let t = self.toks[self.pos].clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn text_of(&self, t: &Token) -> &'a str {
        t.text(self.src)
    }

    fn is(&self, s: &str) -> bool {
        self.cur().is(self.src, s)
    }

    fn is_kw(&self, s: &str) -> bool {
        self.cur().kind == TokenKind::Keyword && self.is(s)
    }

    fn consume(&mut self, s: &str) -> bool {
        if self.is(s) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn try_consume(&mut self, s: &str) -> Option<Span> {
        if self.is(s) {
            Some(Span::from(&self.bump()))
        } else {
            None
        }
    }

    fn expect_punct(&mut self, s: &str) -> Result<(), CompileError> {
        if self.consume(s) {
            Ok(())
        } else {
            Err(CompileError::at_token(
                self.src,
                &self.peek(),
                format!("expected '{s}'"),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<Token, CompileError> {
        if self.cur().kind == TokenKind::Ident {
            Ok(self.bump())
        } else {
            Err(CompileError::at_token(self.src, &self.peek(), "expected an identifier"))
        }
    }

    fn expect_number(&mut self) -> Result<i64, CompileError> {
        if self.cur().kind == TokenKind::Num {
            Ok(self.bump().val)
        } else {
            Err(CompileError::at_token(self.src, &self.peek(), "expected a number"))
        }
    }

    /// Does the token at `idx` start a type (for `cast`/`sizeof`
    /// lookahead, and for distinguishing declarations from statements)?
    fn is_type_start_at(&self, idx: usize) -> bool {
        let t = &self.toks[idx];
        match t.kind {
            TokenKind::Keyword => TYPE_KEYWORDS.contains(&t.text(self.src)),
            TokenKind::Ident => matches!(
                self.scopes.find_var(t.text(self.src)),
                Some(Binding::Typedef(_))
            ),
            _ => false,
        }
    }

    fn is_decl_start(&self) -> bool {
        self.is_kw("typedef") || self.is_type_start_at(self.pos)
    }

    // --- program / declspec / declarator ---

    fn program(&mut self) -> Result<(), CompileError> {
        while !self.at_eof() {
            let (base, is_typedef) = self.declspec()?;
            if is_typedef {
                self.parse_typedef(base)?;
            } else {
                self.parse_global_or_function(base)?;
            }
        }
        Ok(())
    }

    /// Accumulate a bitmap of type-specifier keywords, matching valid
    /// combinations to a single base type (spec.md 4.E). A `struct`,
    /// `union`, or typedef-name specifier is terminal: no further type
    /// keywords are accepted afterward.
    fn declspec(&mut self) -> Result<(Ty, bool), CompileError> {
        const VOID: i32 = 1 << 0;
        const CHAR: i32 = 1 << 2;
        const SHORT: i32 = 1 << 4;
        const INT: i32 = 1 << 6;
        const LONG: i32 = 1 << 8;
        const OTHER: i32 = 1 << 10;

        let mut counter = 0;
        let mut is_typedef = false;
        let mut other_ty: Option<Ty> = None;

        loop {
            if self.is_kw("typedef") {
                self.bump();
                is_typedef = true;
                continue;
            }
            if counter & OTHER != 0 {
                break;
            }
            if self.is_kw("struct") {
                self.bump();
                other_ty = Some(self.struct_decl()?);
                counter += OTHER;
                continue;
            }
            if self.is_kw("union") {
                self.bump();
                other_ty = Some(self.union_decl()?);
                counter += OTHER;
                continue;
            }
            if counter == 0 && self.cur().kind == TokenKind::Ident {
                if let Some(Binding::Typedef(t)) = self.scopes.find_var(self.text_of(&self.cur().clone())) {
                    other_ty = Some(t.clone());
                    self.bump();
                    counter += OTHER;
                    continue;
                }
            }
            if self.is_kw("void") {
                self.bump();
                counter += VOID;
                continue;
            }
            if self.is_kw("char") {
                self.bump();
                counter += CHAR;
                continue;
            }
            if self.is_kw("short") {
                self.bump();
                counter += SHORT;
                continue;
            }
            if self.is_kw("int") {
                self.bump();
                counter += INT;
                continue;
            }
            if self.is_kw("long") {
                self.bump();
                counter += LONG;
                continue;
            }
            break;
        }

        if counter & OTHER != 0 {
            return Ok((other_ty.expect("OTHER set implies a resolved type"), is_typedef));
        }

        let resolved = if counter == VOID {
            ty::void_ty()
        } else if counter == CHAR {
            ty::char_ty()
        } else if counter == SHORT || counter == SHORT + INT {
            ty::short_ty()
        } else if counter == INT {
            ty::int_ty()
        } else if counter == LONG || counter == LONG + INT || counter == 2 * LONG || counter == 2 * LONG + INT {
            ty::long_ty()
        } else {
            return Err(CompileError::at_token(self.src, &self.peek(), "expected a type"));
        };
        Ok((resolved, is_typedef))
    }

    /// `declarator ::= "*"* ("(" declarator ")" | ident) type_suffix`.
    /// Parenthesized declarators are parsed twice: once as a throwaway
    /// recursion just to find the matching `)` (so `type_suffix` can
    /// run on the outer base type), then for real with the suffix
    /// folded into the base (spec.md 4.E).
    fn declarator(&mut self, mut base: Ty) -> Result<Declared, CompileError> {
        while self.consume("*") {
            base = ty::pointer_to(base);
        }

        if self.consume("(") {
            let start = self.pos;
            self.declarator(ty::int_ty())?;
            self.expect_punct(")")?;
            let (suffixed, outer_names) = self.type_suffix(base)?;
            let end = self.pos;
            self.pos = start;
            let inner = self.declarator(suffixed)?;
            self.pos = end;
            let param_names = if inner.param_names.is_empty() {
                outer_names
            } else {
                inner.param_names
            };
            return Ok(Declared {
                name: inner.name,
                ty: inner.ty,
                param_names,
            });
        }

        let name = if self.cur().kind == TokenKind::Ident {
            Some(self.bump())
        } else {
            None
        };
        let (ty, param_names) = self.type_suffix(base)?;
        Ok(Declared { name, ty, param_names })
    }

    /// `type_suffix ::= "(" func_params | "[" number "]" type_suffix | ε`
    fn type_suffix(&mut self, base: Ty) -> Result<(Ty, Vec<Option<Token>>), CompileError> {
        if self.consume("(") {
            return self.func_params(base);
        }
        if self.consume("[") {
            let len = self.expect_number()?;
            if len < 0 {
                return Err(CompileError::at_token(self.src, &self.peek(), "array length must not be negative"));
            }
            self.expect_punct("]")?;
            let (elem, _) = self.type_suffix(base)?;
            return Ok((ty::array_of(elem, len as usize), Vec::new()));
        }
        Ok((base, Vec::new()))
    }

    /// Parses a parameter list whose opening `(` the caller already
    /// consumed, building a FUNC type plus (when present) each
    /// parameter's name token.
    fn func_params(&mut self, return_ty: Ty) -> Result<(Ty, Vec<Option<Token>>), CompileError> {
        let mut types = Vec::new();
        let mut names = Vec::new();
        if !self.is(")") {
            loop {
                let (base, _) = self.declspec()?;
                let d = self.declarator(base)?;
                types.push(d.ty);
                names.push(d.name);
                if !self.consume(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;
        Ok((ty::func_type(return_ty, types), names))
    }

    /// Parses a type with no bound name, used by `sizeof(type)` and
    /// casts.
    fn type_name(&mut self) -> Result<Ty, CompileError> {
        let (base, _) = self.declspec()?;
        let d = self.declarator(base)?;
        Ok(d.ty)
    }

    // --- top-level declarations ---

    fn parse_typedef(&mut self, base: Ty) -> Result<(), CompileError> {
        loop {
            let d = self.declarator(base.clone())?;
            let name_tok = d
                .name
                .ok_or_else(|| CompileError::at_token(self.src, &self.peek(), "typedef requires a name"))?;
            self.scopes.push_typedef(self.text_of(&name_tok), d.ty);
            if !self.consume(",") {
                break;
            }
        }
        self.expect_punct(";")
    }

    fn parse_global_or_function(&mut self, base: Ty) -> Result<(), CompileError> {
        loop {
            let d = self.declarator(base.clone())?;
            let name_tok = d
                .name
                .ok_or_else(|| CompileError::at_token(self.src, &self.peek(), "expected a declarator name"))?;
            let name = self.text_of(&name_tok).to_string();

            if d.ty.is_func() {
                if self.is("{") {
                    self.parse_function(name, d.ty, d.param_names, &name_tok)?;
                    return Ok(());
                }
                let sym = Object::new_function(name.clone(), d.ty, false);
                self.globals.push(sym.clone());
                self.scopes.push_var(&name, sym);
            } else {
                if matches!(d.ty.kind, TypeKind::Void) {
                    return Err(CompileError::at_token(self.src, &name_tok, "variable declared void"));
                }
                let sym = Object::new_var(name.clone(), d.ty, false);
                self.globals.push(sym.clone());
                self.scopes.push_var(&name, sym);
            }

            if !self.consume(",") {
                break;
            }
        }
        self.expect_punct(";")
    }

    fn parse_function(
        &mut self,
        name: String,
        func_ty: Ty,
        param_names: Vec<Option<Token>>,
        name_tok: &Token,
    ) -> Result<(), CompileError> {
        let sym = Object::new_function(name.clone(), func_ty.clone(), true);
        self.globals.push(sym.clone());
        self.scopes.push_var(&name, sym.clone());

        self.scopes.enter_scope();
        let saved_locals = std::mem::take(&mut self.cur_locals);
        let saved_ret_ty = self.cur_fn_ret_ty.take();
        let (return_ty, param_tys) = match &func_ty.kind {
            TypeKind::Func { return_ty, params } => (return_ty.clone(), params.clone()),
            _ => unreachable!("parse_function requires a FUNC type"),
        };
        self.cur_fn_ret_ty = Some(return_ty);

        let mut params = Vec::with_capacity(param_tys.len());
        for (name_tok_opt, pty) in param_names.iter().zip(param_tys.iter()) {
            let ptok = name_tok_opt
                .clone()
                .ok_or_else(|| CompileError::at_token(self.src, name_tok, "parameter name omitted"))?;
            let pname = self.text_of(&ptok).to_string();
            let psym = Object::new_var(pname.clone(), pty.clone(), true);
            self.scopes.push_var(&pname, psym.clone());
            self.cur_locals.push(psym.clone());
            params.push(psym);
        }

        self.expect_punct("{")?;
        let body = self.compound_stmt()?;

        {
            let mut obj = sym.borrow_mut();
            obj.body = Some(body);
            obj.params = params;
            obj.locals = std::mem::replace(&mut self.cur_locals, saved_locals);
        }
        self.cur_fn_ret_ty = saved_ret_ty;
        self.scopes.leave_scope();
        Ok(())
    }

    // --- struct / union ---

    fn try_tag_name(&mut self) -> Option<String> {
        if self.cur().kind == TokenKind::Ident {
            let t = self.bump();
            Some(self.text_of(&t).to_string())
        } else {
            None
        }
    }

    fn struct_union_members(&mut self) -> Result<Vec<(String, Ty)>, CompileError> {
        self.expect_punct("{")?;
        let mut members = Vec::new();
        while !self.is("}") {
            let (base, _) = self.declspec()?;
            loop {
                let d = self.declarator(base.clone())?;
                let name_tok = d
                    .name
                    .ok_or_else(|| CompileError::at_token(self.src, &self.peek(), "member name omitted"))?;
                members.push((self.text_of(&name_tok).to_string(), d.ty));
                if !self.consume(",") {
                    break;
                }
            }
            self.expect_punct(";")?;
        }
        self.expect_punct("}")?;
        Ok(members)
    }

    fn struct_decl(&mut self) -> Result<Ty, CompileError> {
        let tag = self.try_tag_name();
        if let Some(name) = &tag {
            if !self.is("{") {
                return self
                    .scopes
                    .find_tag(name)
                    .cloned()
                    .ok_or_else(|| CompileError::at_token(self.src, &self.peek(), format!("unknown struct tag: '{name}'")));
            }
        }
        let members = self.struct_union_members()?;
        let ty = ty::struct_type(members);
        if let Some(name) = tag {
            self.scopes.push_tag(&name, ty.clone());
        }
        Ok(ty)
    }

    fn union_decl(&mut self) -> Result<Ty, CompileError> {
        let tag = self.try_tag_name();
        if let Some(name) = &tag {
            if !self.is("{") {
                return self
                    .scopes
                    .find_tag(name)
                    .cloned()
                    .ok_or_else(|| CompileError::at_token(self.src, &self.peek(), format!("unknown union tag: '{name}'")));
            }
        }
        let members = self.struct_union_members()?;
        let ty = ty::union_type(members);
        if let Some(name) = tag {
            self.scopes.push_tag(&name, ty.clone());
        }
        Ok(ty)
    }

    // --- statements ---

    fn compound_stmt(&mut self) -> Result<Node, CompileError> {
        let span = Span::from(&self.peek());
        self.scopes.enter_scope();
        let mut body = Vec::new();
        while !self.is("}") {
            if self.is_decl_start() {
                let (base, is_typedef) = self.declspec()?;
                if is_typedef {
                    self.parse_typedef(base)?;
                } else {
                    self.parse_local_decls(base, &mut body)?;
                }
            } else {
                body.push(self.stmt()?);
            }
        }
        self.expect_punct("}")?;
        self.scopes.leave_scope();
        Ok(ast::new_block(body, span))
    }

    /// `declaration ::= declspec (declarator ("=" assign)? ("," ...)*)? ";"`
    /// An initializer desugars to a plain assignment statement appended
    /// to the enclosing block, right after the symbol is bound — the
    /// declarator grammar itself (spec.md 4.E) carries no initializer
    /// clause, so `int i = 0;` is just sugar for `int i; i = 0;`.
    fn parse_local_decls(&mut self, base: Ty, body: &mut Vec<Node>) -> Result<(), CompileError> {
        loop {
            let d = self.declarator(base.clone())?;
            let name_tok = d
                .name
                .ok_or_else(|| CompileError::at_token(self.src, &self.peek(), "expected a declarator name"))?;
            if matches!(d.ty.kind, TypeKind::Void) {
                return Err(CompileError::at_token(self.src, &name_tok, "variable declared void"));
            }
            let name = self.text_of(&name_tok).to_string();
            let sym = Object::new_var(name.clone(), d.ty, true);
            self.scopes.push_var(&name, sym.clone());
            self.cur_locals.push(sym.clone());

            if let Some(span) = self.try_consume("=") {
                let init = self.assign()?;
                let var = ast::new_var(sym, span);
                let assign_node = ast::new_assign(var, init, self.src, span)?;
                body.push(ast::new_expr_stmt(assign_node, span));
            }

            if !self.consume(",") {
                break;
            }
        }
        self.expect_punct(";")
    }

    fn stmt(&mut self) -> Result<Node, CompileError> {
        if self.is_kw("return") {
            let tok = self.bump();
            let span = Span::from(&tok);
            let value = self.expr()?;
            self.expect_punct(";")?;
            let ret_ty = self
                .cur_fn_ret_ty
                .clone()
                .expect("return statement outside a function body");
            return Ok(ast::new_return(ast::new_cast(value, ret_ty, span), span));
        }
        if self.is_kw("if") {
            let tok = self.bump();
            let span = Span::from(&tok);
            self.expect_punct("(")?;
            let cond = self.expr()?;
            self.expect_punct(")")?;
            let then = self.stmt()?;
            let els = if self.is_kw("else") {
                self.bump();
                Some(self.stmt()?)
            } else {
                None
            };
            return Ok(ast::new_if(cond, then, els, span));
        }
        if self.is_kw("for") {
            let tok = self.bump();
            let span = Span::from(&tok);
            self.expect_punct("(")?;
            let init = if !self.is(";") { Some(self.expr()?) } else { None };
            self.expect_punct(";")?;
            let cond = if !self.is(";") { Some(self.expr()?) } else { None };
            self.expect_punct(";")?;
            let inc = if !self.is(")") { Some(self.expr()?) } else { None };
            self.expect_punct(")")?;
            let body = self.stmt()?;
            return Ok(ast::new_for(init, cond, inc, body, span));
        }
        if self.is_kw("while") {
            let tok = self.bump();
            let span = Span::from(&tok);
            self.expect_punct("(")?;
            let cond = self.expr()?;
            self.expect_punct(")")?;
            let body = self.stmt()?;
            return Ok(ast::new_for(None, Some(cond), None, body, span));
        }
        if self.consume("{") {
            return self.compound_stmt();
        }
        self.expr_stmt()
    }

    fn expr_stmt(&mut self) -> Result<Node, CompileError> {
        let span = Span::from(&self.peek());
        if self.consume(";") {
            return Ok(ast::new_block(Vec::new(), span));
        }
        let e = self.expr()?;
        self.expect_punct(";")?;
        Ok(ast::new_expr_stmt(e, span))
    }

    // --- expressions ---

    fn expr(&mut self) -> Result<Node, CompileError> {
        let node = self.assign()?;
        if let Some(span) = self.try_consume(",") {
            let rhs = self.expr()?;
            return Ok(ast::new_comma(node, rhs, span));
        }
        Ok(node)
    }

    fn assign(&mut self) -> Result<Node, CompileError> {
        let node = self.equality()?;
        if let Some(span) = self.try_consume("=") {
            let rhs = self.assign()?;
            return ast::new_assign(node, rhs, self.src, span);
        }
        Ok(node)
    }

    fn equality(&mut self) -> Result<Node, CompileError> {
        let mut node = self.relational()?;
        loop {
            if let Some(span) = self.try_consume("==") {
                node = ast::new_eq(node, self.relational()?, span);
            } else if let Some(span) = self.try_consume("!=") {
                node = ast::new_ne(node, self.relational()?, span);
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn relational(&mut self) -> Result<Node, CompileError> {
        let mut node = self.add()?;
        loop {
            if let Some(span) = self.try_consume("<=") {
                node = ast::new_le(node, self.add()?, span);
            } else if let Some(span) = self.try_consume(">=") {
                let rhs = self.add()?;
                node = ast::new_le(rhs, node, span);
            } else if let Some(span) = self.try_consume("<") {
                node = ast::new_lt(node, self.add()?, span);
            } else if let Some(span) = self.try_consume(">") {
                let rhs = self.add()?;
                node = ast::new_lt(rhs, node, span);
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn add(&mut self) -> Result<Node, CompileError> {
        let mut node = self.mul()?;
        loop {
            if let Some(span) = self.try_consume("+") {
                let rhs = self.mul()?;
                node = ast::new_add(node, rhs, self.src, span)?;
            } else if let Some(span) = self.try_consume("-") {
                let rhs = self.mul()?;
                node = ast::new_sub(node, rhs, self.src, span)?;
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn mul(&mut self) -> Result<Node, CompileError> {
        let mut node = self.cast_expr()?;
        loop {
            if let Some(span) = self.try_consume("*") {
                node = ast::new_mul(node, self.cast_expr()?, span);
            } else if let Some(span) = self.try_consume("/") {
                node = ast::new_div(node, self.cast_expr()?, span);
            } else {
                break;
            }
        }
        Ok(node)
    }

    fn cast_expr(&mut self) -> Result<Node, CompileError> {
        if self.is("(") && self.is_type_start_at(self.pos + 1) {
            let tok = self.bump();
            let span = Span::from(&tok);
            let ty = self.type_name()?;
            self.expect_punct(")")?;
            let operand = self.cast_expr()?;
            return Ok(ast::new_cast(operand, ty, span));
        }
        self.unary()
    }

    fn unary(&mut self) -> Result<Node, CompileError> {
        if self.try_consume("+").is_some() {
            return self.cast_expr();
        }
        if let Some(span) = self.try_consume("-") {
            return Ok(ast::new_neg(self.cast_expr()?, span));
        }
        if let Some(span) = self.try_consume("*") {
            return ast::new_deref(self.cast_expr()?, self.src, span);
        }
        if let Some(span) = self.try_consume("&") {
            return Ok(ast::new_addr(self.cast_expr()?, span));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Node, CompileError> {
        let mut node = self.primary()?;
        loop {
            if let Some(span) = self.try_consume("[") {
                let idx = self.expr()?;
                self.expect_punct("]")?;
                let added = ast::new_add(node, idx, self.src, span)?;
                node = ast::new_deref(added, self.src, span)?;
                continue;
            }
            if let Some(span) = self.try_consume(".") {
                node = self.member_access(node, span)?;
                continue;
            }
            if let Some(span) = self.try_consume("->") {
                let deref = ast::new_deref(node, self.src, span)?;
                node = self.member_access(deref, span)?;
                continue;
            }
            break;
        }
        Ok(node)
    }

    fn member_access(&mut self, lhs: Node, span: Span) -> Result<Node, CompileError> {
        if !lhs.ty().is_struct_or_union() {
            return Err(CompileError::at(self.src, span.loc, "not a struct nor a union"));
        }
        let name_tok = self.expect_ident()?;
        let name = self.text_of(&name_tok);
        let member = lhs
            .ty()
            .find_member(name)
            .cloned()
            .ok_or_else(|| CompileError::at_token(self.src, &name_tok, format!("no such member: '{name}'")))?;
        Ok(ast::new_member(lhs, member, span))
    }

    fn primary(&mut self) -> Result<Node, CompileError> {
        if self.is("(") && self.toks[self.pos + 1].kind == TokenKind::Punct && self.toks[self.pos + 1].is(self.src, "{") {
            let tok = self.bump();
            let span = Span::from(&tok);
            self.bump(); // consume "{"
            let block = self.compound_stmt()?;
            self.expect_punct(")")?;
            let body = match block.kind {
                NodeKind::Block(stmts) => stmts,
                _ => unreachable!("compound_stmt always returns a Block"),
            };
            return ast::new_stmt_expr(body, self.src, span);
        }
        if self.consume("(") {
            let node = self.expr()?;
            self.expect_punct(")")?;
            return Ok(node);
        }
        if self.is_kw("sizeof") {
            let tok = self.bump();
            let span = Span::from(&tok);
            if self.is("(") && self.is_type_start_at(self.pos + 1) {
                self.bump();
                let ty = self.type_name()?;
                self.expect_punct(")")?;
                return Ok(ast::new_num(ty.size, span));
            }
            let operand = self.unary()?;
            return Ok(ast::new_num(operand.ty().size, span));
        }
        if self.cur().kind == TokenKind::Num {
            let tok = self.bump();
            return Ok(ast::new_num(tok.val, Span::from(&tok)));
        }
        if self.cur().kind == TokenKind::Str {
            let tok = self.bump();
            return self.new_string_literal(tok);
        }
        if self.cur().kind == TokenKind::Ident {
            let tok = self.bump();
            let span = Span::from(&tok);
            let name = self.text_of(&tok).to_string();
            if self.is("(") {
                return self.funcall(name, span);
            }
            return match self.scopes.find_var(&name) {
                Some(Binding::Var(sym)) => Ok(ast::new_var(sym.clone(), span)),
                Some(Binding::Typedef(_)) => {
                    Err(CompileError::at_token(self.src, &tok, format!("'{name}' is a typedef, not a variable")))
                }
                None => Err(CompileError::at_token(self.src, &tok, format!("undefined variable: '{name}'"))),
            };
        }
        Err(CompileError::at_token(self.src, &self.peek(), "expected an expression"))
    }

    fn new_string_literal(&mut self, tok: Token) -> Result<Node, CompileError> {
        let payload = tok
            .str_val
            .clone()
            .expect("Str token is always created with a payload");
        let name = format!(".L..{}", self.anon_count);
        self.anon_count += 1;
        let sym = Object::new_var(name.clone(), payload.ty, false);
        sym.borrow_mut().init_data = Some(payload.bytes);
        self.globals.push(sym.clone());
        Ok(ast::new_var(sym, Span::from(&tok)))
    }

    fn funcall(&mut self, name: String, span: Span) -> Result<Node, CompileError> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        if !self.is(")") {
            loop {
                args.push(self.assign()?);
                if !self.consume(",") {
                    break;
                }
            }
        }
        self.expect_punct(")")?;

        let sym = match self.scopes.find_var(&name) {
            Some(Binding::Var(s)) if s.borrow().is_function => s.clone(),
            Some(_) => return Err(CompileError::at(self.src, span.loc, format!("not a function: '{name}'"))),
            None => {
                return Err(CompileError::at(
                    self.src,
                    span.loc,
                    format!("implicit declaration of function '{name}' is not supported"),
                ))
            }
        };
        if args.len() > 6 {
            return Err(CompileError::at(self.src, span.loc, "too many arguments (maximum is 6)"));
        }

        let func_ty = sym.borrow().ty.clone();
        let params = match &func_ty.kind {
            TypeKind::Func { params, .. } => params.clone(),
            _ => unreachable!("a function symbol always has a FUNC type"),
        };
        let mut cast_args = Vec::with_capacity(args.len());
        for (i, arg) in args.into_iter().enumerate() {
            match params.get(i) {
                Some(pty) => {
                    if pty.is_struct_or_union() || arg.ty().is_struct_or_union() {
                        return Err(CompileError::at(
                            self.src,
                            span.loc,
                            "passing a struct or union by value is not supported",
                        ));
                    }
                    cast_args.push(ast::new_cast(arg, pty.clone(), span));
                }
                None => cast_args.push(arg),
            }
        }
        Ok(ast::new_funcall(name, func_ty, cast_args, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    fn parse_ok(src: &str) -> Vec<SymbolRef> {
        let toks = tokenize(src).unwrap();
        parse(src, &toks).unwrap_or_else(|e| panic!("parse error: {e}"))
    }

    fn find<'a>(globals: &'a [SymbolRef], name: &str) -> &'a SymbolRef {
        globals
            .iter()
            .find(|g| g.borrow().name == name)
            .unwrap_or_else(|| panic!("no symbol named {name}"))
    }

    #[test]
    fn parses_arithmetic_main() {
        let globals = parse_ok("int main(){ return 5*(9-6)/3 + 1; }");
        let main = find(&globals, "main");
        assert!(main.borrow().is_function);
        assert!(main.borrow().body.is_some());
    }

    #[test]
    fn locals_and_for_loop() {
        let globals = parse_ok("int main(){ int i=0; int j=0; for(i=0;i<=10;i=i+1) j=i+j; return j; }");
        let main = find(&globals, "main");
        assert_eq!(main.borrow().locals.len(), 2);
    }

    #[test]
    fn pointer_and_array_subscript() {
        let globals = parse_ok("int main(){ int a[3]; int *p=a; *p=2; return a[0]; }");
        let main = find(&globals, "main");
        let locals = main.borrow();
        assert_eq!(locals.locals[0].borrow().ty.size, 12); // int a[3]
        assert_eq!(locals.locals[1].borrow().ty.size, 8); // int *p
    }

    #[test]
    fn six_argument_call_resolves_params() {
        let globals = parse_ok(
            "int add6(int a,int b,int c,int d,int e,int f){return a+b+c+d+e+f;} \
             int main(){return add6(1,2,3,4,5,6);}",
        );
        let add6 = find(&globals, "add6");
        assert_eq!(add6.borrow().params.len(), 6);
    }

    #[test]
    fn seventh_argument_is_rejected() {
        let src = "int f(int a,int b,int c,int d,int e,int g){return 0;} int main(){return f(1,2,3,4,5,6,7);}";
        let toks = tokenize(src).unwrap();
        assert!(parse(src, &toks).is_err());
    }

    #[test]
    fn struct_with_alignment_sizeof() {
        let globals = parse_ok("int main(){ struct {char a; int b;} x; x.a=1; x.b=2; return sizeof(x); }");
        let main = find(&globals, "main");
        assert_eq!(main.borrow().locals[0].borrow().ty.size, 8);
    }

    #[test]
    fn union_aliasing_layout() {
        let globals = parse_ok("int main(){ union {int a; char b[4];} x; x.a = 515; return x.b[0] + x.b[1]; }");
        let main = find(&globals, "main");
        let ty = main.borrow().locals[0].borrow().ty.clone();
        assert_eq!(ty.size, 4);
    }

    #[test]
    fn recursive_function_parses() {
        let globals = parse_ok("int fib(int n){ if (n<=1) return 1; return fib(n-1)+fib(n-2); } int main(){ return fib(9); }");
        assert_eq!(globals.len(), 2);
    }

    #[test]
    fn implicit_declaration_is_an_error() {
        let src = "int main(){ return undeclared(1); }";
        let toks = tokenize(src).unwrap();
        assert!(parse(src, &toks).is_err());
    }

    #[test]
    fn struct_pass_by_value_is_rejected() {
        let src = "int f(int x){return x;} int main(){ struct {int x;} s; return f(s); }";
        let toks = tokenize(src).unwrap();
        assert!(parse(src, &toks).is_err());
    }

    #[test]
    fn typedef_introduces_an_alias() {
        let globals = parse_ok("typedef int myint; int main(){ myint x; x = 3; return x; }");
        let main = find(&globals, "main");
        assert_eq!(main.borrow().locals[0].borrow().ty.kind, TypeKind::Int);
    }

    #[test]
    fn string_literal_becomes_anonymous_global() {
        let globals = parse_ok(r#"int f(char *p){return 0;} int main(){ return f("hi"); }"#);
        assert!(globals.iter().any(|g| g.borrow().name.starts_with(".L..")));
    }
}
