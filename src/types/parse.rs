//! Annotation text → `TypeDesc`.
//!
//! Accepts the `Dict[str, Optional[List[int]]]` notation. Record and class
//! names are resolved through a [`TypeNamespace`].
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConversionError, Result};
use crate::record::RecordType;
use crate::value::FixedKind;

use super::{CollectionKind, MappingKind, ScalarType, SequenceKind, TupleShape, TypeDesc};

static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?P<name>[A-Za-z_][A-Za-z0-9_]*)|(?P<ellipsis>\.\.\.)|(?P<unit>\(\s*\))|(?P<punct>[\[\],]))")
        .expect("token regex")
});

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token<'a> {
    Name(&'a str),
    Ellipsis,
    Unit,
    Open,
    Close,
    Comma,
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>> {
    let mut tokens = Vec::new();
    let mut rest = text;
    while !rest.trim_start().is_empty() {
        let caps = TOKEN.captures(rest).ok_or_else(|| {
            let at = rest.trim_start();
            ConversionError::invalid_annotation(text, format!("unexpected input at `{at}`"))
        })?;
        let token = if let Some(m) = caps.name("name") {
            Token::Name(m.as_str())
        } else if caps.name("ellipsis").is_some() {
            Token::Ellipsis
        } else if caps.name("unit").is_some() {
            Token::Unit
        } else {
            match caps.name("punct").map(|m| m.as_str()) {
                Some("[") => Token::Open,
                Some("]") => Token::Close,
                _ => Token::Comma,
            }
        };
        tokens.push(token);
        let consumed = caps.get(0).map_or(rest.len(), |m| m.end());
        rest = &rest[consumed..];
    }
    Ok(tokens)
}

// ------------------------------- Namespace ------------------------------- //

/// Names beyond the builtins: declared records and opaque classes.
#[derive(Clone, Debug, Default)]
pub struct TypeNamespace {
    records: IndexMap<String, Arc<RecordType>>,
    classes: IndexSet<String>,
}

impl TypeNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a record under its own name.
    pub fn register_record(&mut self, ty: Arc<RecordType>) -> &mut Self {
        self.records.insert(ty.name().to_string(), ty);
        self
    }

    pub fn register_class(&mut self, name: impl Into<String>) -> &mut Self {
        self.classes.insert(name.into());
        self
    }

    pub fn record(&self, name: &str) -> Option<&Arc<RecordType>> {
        self.records.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &Arc<RecordType>> {
        self.records.values()
    }

    pub fn parse(&self, text: &str) -> Result<TypeDesc> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { ns: self, text, tokens: &tokens, pos: 0 };
        let ty = parser.ty()?;
        match parser.peek() {
            None => Ok(ty),
            Some(tok) => Err(parser.fail(format!("trailing {tok:?}"))),
        }
    }
}

// -------------------------------- Parser --------------------------------- //

enum Arg {
    Ty(TypeDesc),
    Ellipsis,
    Unit,
}

struct Parser<'n, 't> {
    ns: &'n TypeNamespace,
    text: &'t str,
    tokens: &'t [Token<'t>],
    pos: usize,
}

impl<'n, 't> Parser<'n, 't> {
    fn peek(&self) -> Option<&Token<'t>> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token<'t>> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn fail(&self, detail: impl std::fmt::Display) -> ConversionError {
        ConversionError::invalid_annotation(self.text, detail)
    }

    fn ty(&mut self) -> Result<TypeDesc> {
        let name = match self.next() {
            Some(Token::Name(name)) => name,
            Some(tok) => return Err(self.fail(format!("expected a type name, found {tok:?}"))),
            None => return Err(self.fail("expected a type name")),
        };
        let args = if self.peek() == Some(&Token::Open) {
            self.pos += 1;
            Some(self.args()?)
        } else {
            None
        };
        self.build(name, args)
    }

    fn args(&mut self) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        loop {
            let arg = match self.peek() {
                Some(Token::Ellipsis) => {
                    self.pos += 1;
                    Arg::Ellipsis
                }
                Some(Token::Unit) => {
                    self.pos += 1;
                    Arg::Unit
                }
                _ => Arg::Ty(self.ty()?),
            };
            args.push(arg);
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::Close) => return Ok(args),
                _ => return Err(self.fail("expected `,` or `]`")),
            }
        }
    }

    fn types(&self, name: &str, args: Vec<Arg>) -> Result<Vec<TypeDesc>> {
        args.into_iter()
            .map(|arg| match arg {
                Arg::Ty(ty) => Ok(ty),
                Arg::Ellipsis | Arg::Unit => Err(self.fail(format!("`...` and `()` are only valid in Tuple, not {name}"))),
            })
            .collect()
    }

    fn arity(&self, name: &str, args: Vec<Arg>, n: usize) -> Result<Vec<TypeDesc>> {
        let types = self.types(name, args)?;
        if types.len() != n {
            return Err(self.fail(format!("{name} takes {n} parameter(s), got {}", types.len())));
        }
        Ok(types)
    }

    fn one(&self, name: &str, args: Vec<Arg>) -> Result<Box<TypeDesc>> {
        let mut types = self.arity(name, args, 1)?;
        types.pop().map(Box::new).ok_or_else(|| self.fail(format!("{name} takes 1 parameter")))
    }

    fn build(&self, name: &str, args: Option<Vec<Arg>>) -> Result<TypeDesc> {
        let scalar = match name {
            "Any" => Some(TypeDesc::Any),
            "None" | "NoneType" => Some(TypeDesc::None),
            "bool" => Some(TypeDesc::bool()),
            "int" => Some(TypeDesc::int()),
            "float" => Some(TypeDesc::float()),
            "str" => Some(TypeDesc::str()),
            "Integral" => Some(TypeDesc::Scalar(ScalarType::Integral)),
            "Real" => Some(TypeDesc::Scalar(ScalarType::Real)),
            other => FixedKind::from_name(other).map(TypeDesc::fixed),
        };
        if let Some(ty) = scalar {
            return match args {
                None => Ok(ty),
                Some(_) => Err(self.fail(format!("{name} takes no parameters"))),
            };
        }

        match name {
            "list" | "List" | "Sequence" => {
                let kind = if name == "Sequence" { SequenceKind::Sequence } else { SequenceKind::List };
                let elem = args.map(|a| self.one(name, a)).transpose()?;
                Ok(TypeDesc::Sequence { kind, elem })
            }
            "set" | "Set" | "frozenset" | "FrozenSet" | "Collection" => {
                let kind = match name {
                    "set" | "Set" => CollectionKind::Set,
                    "frozenset" | "FrozenSet" => CollectionKind::FrozenSet,
                    _ => CollectionKind::Collection,
                };
                let elem = args.map(|a| self.one(name, a)).transpose()?;
                Ok(TypeDesc::Collection { kind, elem })
            }
            "dict" | "Dict" | "Mapping" | "FrozenDict" => {
                let kind = match name {
                    "dict" | "Dict" => MappingKind::Dict,
                    "Mapping" => MappingKind::Mapping,
                    _ => MappingKind::FrozenDict,
                };
                let params = match args {
                    None => None,
                    Some(a) => {
                        let mut kv = self.arity(name, a, 2)?.into_iter();
                        match (kv.next(), kv.next()) {
                            (Some(k), Some(v)) => Some(Box::new((k, v))),
                            _ => return Err(self.fail(format!("{name} takes 2 parameters"))),
                        }
                    }
                };
                Ok(TypeDesc::Mapping { kind, params })
            }
            "tuple" | "Tuple" => match args {
                None => Ok(TypeDesc::tuple()),
                Some(a) => self.tuple(a),
            },
            "Union" => {
                let branches = self.types(name, args.unwrap_or_default())?;
                TypeDesc::union(branches).map_err(|e| self.fail(e.message))
            }
            "Optional" => match args {
                Some(a) => Ok(TypeDesc::optional(*self.one(name, a)?)),
                None => Err(self.fail("Optional takes 1 parameter")),
            },
            other => {
                let named = if let Some(record) = self.ns.record(other) {
                    TypeDesc::Record(record.clone())
                } else if self.ns.classes.contains(other) {
                    TypeDesc::class(other)
                } else {
                    return Err(self.fail(format!("unknown type name `{other}`")));
                };
                match args {
                    None => Ok(named),
                    Some(_) => Err(self.fail(format!("{other} takes no parameters"))),
                }
            }
        }
    }

    fn tuple(&self, args: Vec<Arg>) -> Result<TypeDesc> {
        match args.as_slice() {
            [Arg::Unit] => return Ok(TypeDesc::tuple_of(Vec::new())),
            [Arg::Ty(elem), Arg::Ellipsis] => return Ok(TypeDesc::tuple_homogeneous(elem.clone())),
            _ => {}
        }
        let elems = self.types("Tuple", args)?;
        Ok(TypeDesc::tuple_of(elems))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::record::{Field, RecordType};

    #[test]
    fn parses_nested_generics() {
        let ty: TypeDesc = "Dict[int, Union[int, str]]".parse().unwrap();
        assert_eq!(
            ty,
            TypeDesc::dict_of(
                TypeDesc::int(),
                TypeDesc::union([TypeDesc::int(), TypeDesc::str()]).unwrap()
            )
        );
        let ty: TypeDesc = " Sequence[ Optional[uint8] ] ".parse().unwrap();
        assert_eq!(
            ty,
            TypeDesc::sequence_of(TypeDesc::optional(TypeDesc::fixed(FixedKind::U8)))
        );
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "Any",
            "None",
            "list",
            "List[int]",
            "Mapping[str, Real]",
            "FrozenDict[int, float64]",
            "frozenset",
            "Collection[Integral]",
            "Union[int, str, None]",
            "Optional[Dict[str, Set[bool]]]",
            "tuple",
            "Tuple[()]",
            "Tuple[int, str]",
            "Tuple[int, ...]",
        ] {
            let ty: TypeDesc = text.parse().unwrap();
            assert_eq!(ty.to_string(), text);
            assert_eq!(ty.to_string().parse::<TypeDesc>().unwrap(), ty);
        }
    }

    #[test]
    fn builtin_spellings_alias() {
        assert_eq!("List".parse::<TypeDesc>().unwrap(), TypeDesc::list());
        assert_eq!("Dict".parse::<TypeDesc>().unwrap(), TypeDesc::dict());
        assert_eq!("NoneType".parse::<TypeDesc>().unwrap(), TypeDesc::None);
        assert_eq!("Union[int]".parse::<TypeDesc>().unwrap(), TypeDesc::int());
    }

    #[test]
    fn rejects_invalid_annotations() {
        for text in [
            "Foo",
            "List[int, str]",
            "Dict[int]",
            "int[str]",
            "List[",
            "List[int]]",
            "Optional",
            "Union[]",
            "List[...]",
            "Dict[str; int]",
            "",
        ] {
            let err = text.parse::<TypeDesc>().unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidAnnotation, "{text}");
        }
    }

    #[test]
    fn namespace_resolves_records_and_classes() {
        let point = RecordType::builder("Point")
            .field(Field::new("x", TypeDesc::int()))
            .build()
            .unwrap();
        let mut ns = TypeNamespace::new();
        ns.register_record(point.clone()).register_class("Widget");

        assert_eq!(ns.parse("List[Point]").unwrap(), TypeDesc::list_of(TypeDesc::Record(point)));
        assert_eq!(ns.parse("Widget").unwrap(), TypeDesc::class("Widget"));
        assert!("Point".parse::<TypeDesc>().is_err());
    }
}
