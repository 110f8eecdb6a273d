//! Keyword spelling table: many spellings across the three dialects alias
//! to the same `Keyword` (spec §4.1: `self`/`this`, `throw`/`raise`,
//! `null`/`nil`/`None`/`undefined`, `True`/`true`, …).

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use super::token::Keyword;

/// C-style scalar type spellings, lexed as `TokenKind::TypeName` (carrying
/// their text) rather than a plain `Keyword`, so the parser can recover a
/// `TypeHint` from the exact spelling (spec §4.2).
pub static TYPE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "int", "float", "double", "string", "str", "bool", "boolean", "char", "void", "long",
        "short", "byte", "list", "tuple", "dict",
    ]
    .into_iter()
    .collect()
});

pub static KEYWORDS: Lazy<HashMap<&'static str, Keyword>> = Lazy::new(|| {
    use Keyword::*;
    let mut m = HashMap::new();
    m.insert("let", Let);
    m.insert("var", Let);
    m.insert("const", Const);
    m.insert("fn", Fn);
    m.insert("def", Fn);
    m.insert("function", Fn);
    m.insert("class", Class);
    m.insert("struct", Class);
    m.insert("extends", Extends);
    m.insert("static", Static);
    m.insert("if", If);
    m.insert("elif", Elif);
    m.insert("else", Else);
    m.insert("while", While);
    m.insert("for", For);
    m.insert("in", In);
    m.insert("of", Of);
    m.insert("not", Not);
    m.insert("and", And);
    m.insert("or", Or);
    m.insert("return", Return);
    m.insert("break", Break);
    m.insert("continue", Continue);
    m.insert("raise", Raise);
    m.insert("throw", Raise);
    m.insert("try", Try);
    m.insert("except", Except);
    m.insert("catch", Except);
    m.insert("as", As);
    m.insert("finally", Finally);
    m.insert("print", Print);
    m.insert("input", Input);
    m.insert("import", Import);
    m.insert("from", From);
    m.insert("true", True);
    m.insert("True", True);
    m.insert("false", False);
    m.insert("False", False);
    m.insert("nil", Nil);
    m.insert("null", Nil);
    m.insert("None", Nil);
    m.insert("undefined", Nil);
    m.insert("self", Self_);
    m.insert("this", Self_);
    m.insert("super", Super);
    m.insert("new", New);
    m.insert("cout", Cout);
    m.insert("cin", Cin);

    m
});
