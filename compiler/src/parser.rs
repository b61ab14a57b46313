use crate::{
    ast::{
        CompoundDeclaration, Declaration, EnumDeclaration, EnumValueDeclaration, FieldDeclaration,
        Literal, MetadataEntry, SchemaDeclaration, UnionDeclaration,
    },
    error::FlowflatError,
    tokenizer::Token,
    utils::{error, quote},
};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER:        Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
    static ref INTEGER:           Regex = Regex::new(r"^-?\d+$").unwrap();
    static ref FLOAT:             Regex = Regex::new(r"^-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?$").unwrap();
    static ref STRING:            Regex = Regex::new(r#"^"[^"]*"$"#).unwrap();
    static ref EQUALS:            Regex = Regex::new(r"^=$").unwrap();
    static ref SEMICOLON:         Regex = Regex::new(r"^;$").unwrap();
    static ref COLON:             Regex = Regex::new(r"^:$").unwrap();
    static ref COMMA:             Regex = Regex::new(r"^,$").unwrap();
    static ref DOT:               Regex = Regex::new(r"^\.$").unwrap();
    static ref LEFT_BRACE:        Regex = Regex::new(r"^\{$").unwrap();
    static ref RIGHT_BRACE:       Regex = Regex::new(r"^\}$").unwrap();
    static ref LEFT_PAREN:        Regex = Regex::new(r"^\($").unwrap();
    static ref RIGHT_PAREN:       Regex = Regex::new(r"^\)$").unwrap();
    static ref LEFT_BRACKET:      Regex = Regex::new(r"^\[$").unwrap();
    static ref RIGHT_BRACKET:     Regex = Regex::new(r"^\]$").unwrap();
    static ref INCLUDE_KEYWORD:   Regex = Regex::new(r"^include$").unwrap();
    static ref NAMESPACE_KEYWORD: Regex = Regex::new(r"^namespace$").unwrap();
    static ref ATTRIBUTE_KEYWORD: Regex = Regex::new(r"^attribute$").unwrap();
    static ref ROOT_KEYWORD:      Regex = Regex::new(r"^root_type$").unwrap();
    static ref EXTENSION_KEYWORD: Regex = Regex::new(r"^file_extension$").unwrap();
    static ref IDENT_KEYWORD:     Regex = Regex::new(r"^file_identifier$").unwrap();
    static ref ENUM_KEYWORD:      Regex = Regex::new(r"^enum$").unwrap();
    static ref UNION_KEYWORD:     Regex = Regex::new(r"^union$").unwrap();
    static ref STRUCT_KEYWORD:    Regex = Regex::new(r"^struct$").unwrap();
    static ref TABLE_KEYWORD:     Regex = Regex::new(r"^table$").unwrap();
    static ref EOF:               Regex = Regex::new(r"^$").unwrap();
}

/// Cursor over the token list. The tokenizer always appends an empty EOF
/// token, so `current` clamps to it instead of running off the end.
struct Cursor<'a> {
    tokens: &'a [Token],
    index:  usize,
}

impl<'a> Cursor<'a> {
    fn current(&self) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.index.min(last)]
    }

    fn at_end(&self) -> bool {
        EOF.is_match(&self.current().text)
    }

    fn peek(&self, test: &Regex) -> bool {
        test.is_match(&self.current().text)
    }

    fn eat(&mut self, test: &Regex) -> bool {
        if self.peek(test) && !self.at_end() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, test: &Regex, expected: &str) -> Result<&'a Token, FlowflatError> {
        let tok = self.current();
        if !self.eat(test) {
            return Err(error(
                &format!("Expected {} but found {}", expected, describe(tok)),
                tok.line,
                tok.column,
            ));
        }
        Ok(tok)
    }

    fn unexpected_token(&self) -> FlowflatError {
        let tok = self.current();
        error(
            &format!("Unexpected token {}", describe(tok)),
            tok.line,
            tok.column,
        )
    }
}

fn describe(tok: &Token) -> String {
    if tok.text.is_empty() {
        "end of file".to_string()
    } else {
        quote(&tok.text)
    }
}

fn unquote(text: &str) -> String {
    text[1..text.len() - 1].to_string()
}

/// Parses a token stream (see [`crate::tokenizer::tokenize_schema`]) into the
/// declaration list consumed by the semantic compiler.
pub fn parse_schema(tokens: &[Token]) -> Result<SchemaDeclaration, FlowflatError> {
    let mut cursor = Cursor { tokens, index: 0 };
    let mut declarations = Vec::new();

    while !cursor.at_end() {
        let declaration = if cursor.eat(&INCLUDE_KEYWORD) {
            let path = cursor.expect(&STRING, "string")?;
            cursor.expect(&SEMICOLON, "\";\"")?;
            Declaration::Include(unquote(&path.text))
        } else if cursor.eat(&NAMESPACE_KEYWORD) {
            let path = parse_path(&mut cursor)?;
            cursor.expect(&SEMICOLON, "\";\"")?;
            Declaration::Namespace(path)
        } else if cursor.eat(&ATTRIBUTE_KEYWORD) {
            let tok = cursor.current();
            let name = if cursor.eat(&STRING) {
                unquote(&tok.text)
            } else {
                cursor.expect(&IDENTIFIER, "identifier or string")?.text.clone()
            };
            cursor.expect(&SEMICOLON, "\";\"")?;
            Declaration::Attribute(name)
        } else if cursor.eat(&ROOT_KEYWORD) {
            let name = parse_path(&mut cursor)?.join(".");
            cursor.expect(&SEMICOLON, "\";\"")?;
            Declaration::RootType(name)
        } else if cursor.eat(&EXTENSION_KEYWORD) {
            let ext = cursor.expect(&STRING, "string")?;
            cursor.expect(&SEMICOLON, "\";\"")?;
            Declaration::FileExtension(unquote(&ext.text))
        } else if cursor.eat(&IDENT_KEYWORD) {
            let ident = cursor.expect(&STRING, "string")?;
            cursor.expect(&SEMICOLON, "\";\"")?;
            Declaration::FileIdentifier(unquote(&ident.text))
        } else if cursor.eat(&ENUM_KEYWORD) {
            Declaration::Enum(parse_enum(&mut cursor)?)
        } else if cursor.eat(&UNION_KEYWORD) {
            Declaration::Union(parse_union(&mut cursor)?)
        } else if cursor.eat(&STRUCT_KEYWORD) {
            let decl = parse_compound(&mut cursor)?;
            if decl.fields.is_empty() {
                return Err(error(
                    &format!("Struct {} needs at least one field", quote(&decl.name)),
                    decl.line,
                    decl.column,
                ));
            }
            Declaration::Struct(decl)
        } else if cursor.eat(&TABLE_KEYWORD) {
            Declaration::Table(parse_compound(&mut cursor)?)
        } else {
            return Err(cursor.unexpected_token());
        };
        declarations.push(declaration);
    }

    Ok(SchemaDeclaration { declarations })
}

fn parse_path(cursor: &mut Cursor) -> Result<Vec<String>, FlowflatError> {
    let mut path = vec![cursor.expect(&IDENTIFIER, "identifier")?.text.clone()];
    while cursor.eat(&DOT) {
        path.push(cursor.expect(&IDENTIFIER, "identifier")?.text.clone());
    }
    Ok(path)
}

fn parse_enum(cursor: &mut Cursor) -> Result<EnumDeclaration, FlowflatError> {
    let name = cursor.expect(&IDENTIFIER, "identifier")?;
    cursor.expect(&COLON, "\":\"")?;
    let underlying = cursor.expect(&IDENTIFIER, "identifier")?;
    let metadata = parse_metadata(cursor)?;
    let values = parse_enum_values(cursor)?;
    Ok(EnumDeclaration {
        name:       name.text.clone(),
        underlying: underlying.text.clone(),
        metadata,
        values,
        line:       name.line,
        column:     name.column,
    })
}

fn parse_union(cursor: &mut Cursor) -> Result<UnionDeclaration, FlowflatError> {
    let name = cursor.expect(&IDENTIFIER, "identifier")?;
    let metadata = parse_metadata(cursor)?;
    let members = parse_enum_values(cursor)?;
    Ok(UnionDeclaration {
        name:    name.text.clone(),
        metadata,
        members,
        line:    name.line,
        column:  name.column,
    })
}

/// `{ A, B = 2, C, }` -- shared by enums and unions.
fn parse_enum_values(cursor: &mut Cursor) -> Result<Vec<EnumValueDeclaration>, FlowflatError> {
    cursor.expect(&LEFT_BRACE, "\"{\"")?;
    let mut values = Vec::new();
    loop {
        let tok = cursor.current();
        let name = parse_path(cursor)?.join(".");
        let value = if cursor.eat(&EQUALS) {
            let v_tok = cursor.expect(&INTEGER, "integer")?;
            Some(v_tok.text.parse::<i128>().map_err(|_| {
                error(
                    &format!("Invalid integer {}", quote(&v_tok.text)),
                    v_tok.line,
                    v_tok.column,
                )
            })?)
        } else {
            None
        };
        values.push(EnumValueDeclaration {
            name,
            value,
            line:   tok.line,
            column: tok.column,
        });
        if !cursor.eat(&COMMA) || cursor.peek(&RIGHT_BRACE) {
            break;
        }
    }
    cursor.expect(&RIGHT_BRACE, "\"}\"")?;
    Ok(values)
}

fn parse_compound(cursor: &mut Cursor) -> Result<CompoundDeclaration, FlowflatError> {
    let name = cursor.expect(&IDENTIFIER, "identifier")?;
    let metadata = parse_metadata(cursor)?;
    cursor.expect(&LEFT_BRACE, "\"{\"")?;

    let mut fields = Vec::new();
    while !cursor.eat(&RIGHT_BRACE) {
        if cursor.at_end() {
            return Err(cursor.unexpected_token());
        }
        fields.push(parse_field(cursor)?);
    }

    Ok(CompoundDeclaration {
        name:   name.text.clone(),
        metadata,
        fields,
        line:   name.line,
        column: name.column,
    })
}

fn parse_field(cursor: &mut Cursor) -> Result<FieldDeclaration, FlowflatError> {
    let f_tok = cursor.expect(&IDENTIFIER, "identifier")?;
    cursor.expect(&COLON, "\":\"")?;

    let is_array = cursor.eat(&LEFT_BRACKET);
    let type_name = parse_path(cursor)?.join(".");
    if is_array {
        cursor.expect(&RIGHT_BRACKET, "\"]\"")?;
    }

    let default_value = if cursor.eat(&EQUALS) {
        Some(parse_literal(cursor)?)
    } else {
        None
    };
    let metadata = parse_metadata(cursor)?;
    cursor.expect(&SEMICOLON, "\";\"")?;

    Ok(FieldDeclaration {
        name:   f_tok.text.clone(),
        type_name,
        is_array,
        default_value,
        metadata,
        line:   f_tok.line,
        column: f_tok.column,
    })
}

fn parse_literal(cursor: &mut Cursor) -> Result<Literal, FlowflatError> {
    let tok = cursor.current();
    let text = tok.text.as_str();
    let literal = if INTEGER.is_match(text) {
        let value = text.parse::<i128>().map_err(|_| {
            error(&format!("Invalid integer {}", quote(text)), tok.line, tok.column)
        })?;
        Literal::Integer(value)
    } else if FLOAT.is_match(text) {
        let value = text.parse::<f64>().map_err(|_| {
            error(&format!("Invalid number {}", quote(text)), tok.line, tok.column)
        })?;
        Literal::Float(value)
    } else if STRING.is_match(text) {
        Literal::String(unquote(text))
    } else if text == "true" || text == "false" {
        Literal::Bool(text == "true")
    } else if IDENTIFIER.is_match(text) {
        Literal::Ident(text.to_string())
    } else {
        return Err(error(
            &format!("Expected a value but found {}", describe(tok)),
            tok.line,
            tok.column,
        ));
    };
    cursor.index += 1;
    Ok(literal)
}

/// Optional `( name, name: value, ... )` list.
fn parse_metadata(cursor: &mut Cursor) -> Result<Vec<MetadataEntry>, FlowflatError> {
    let mut entries = Vec::new();
    if !cursor.eat(&LEFT_PAREN) {
        return Ok(entries);
    }
    while !cursor.eat(&RIGHT_PAREN) {
        if !entries.is_empty() {
            cursor.expect(&COMMA, "\",\"")?;
        }
        let name = cursor.expect(&IDENTIFIER, "identifier")?;
        let value = if cursor.eat(&COLON) {
            Some(parse_literal(cursor)?)
        } else {
            None
        };
        entries.push(MetadataEntry {
            name: name.text.clone(),
            value,
        });
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize_schema;

    fn parse(text: &str) -> Result<SchemaDeclaration, FlowflatError> {
        parse_schema(&tokenize_schema(text)?)
    }

    #[test]
    fn test_parse_header_declarations() {
        let schema = parse(
            r#"
            include "base.fbs";
            namespace game.items;
            attribute "priority";
            attribute color;
            file_identifier "ITEM";
            file_extension "itm";
            root_type Item;
            "#,
        )
        .unwrap();

        assert_eq!(
            schema.declarations,
            vec![
                Declaration::Include("base.fbs".into()),
                Declaration::Namespace(vec!["game".into(), "items".into()]),
                Declaration::Attribute("priority".into()),
                Declaration::Attribute("color".into()),
                Declaration::FileIdentifier("ITEM".into()),
                Declaration::FileExtension("itm".into()),
                Declaration::RootType("Item".into()),
            ]
        );
    }

    #[test]
    fn test_parse_enum_and_union() {
        let schema = parse(
            r#"
            enum Color : ubyte (bit_flags) { Red, Green = 5, Blue, }
            union Shape { Circle, geo.Square }
            "#,
        )
        .unwrap();

        let Declaration::Enum(color) = &schema.declarations[0] else {
            panic!("expected an enum, got {:?}", schema.declarations[0]);
        };
        assert_eq!(color.name, "Color");
        assert_eq!(color.underlying, "ubyte");
        assert_eq!(color.metadata[0].name, "bit_flags");
        let values: Vec<_> = color.values.iter().map(|v| (v.name.as_str(), v.value)).collect();
        assert_eq!(values, vec![("Red", None), ("Green", Some(5)), ("Blue", None)]);

        let Declaration::Union(shape) = &schema.declarations[1] else {
            panic!("expected a union, got {:?}", schema.declarations[1]);
        };
        let members: Vec<_> = shape.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(members, vec!["Circle", "geo.Square"]);
    }

    #[test]
    fn test_parse_fields() {
        let schema = parse(
            r#"
            table Monster (original_order) {
              pos: Vec3;
              hp: short = 100;
              name: string (required, key);
              inventory: [ubyte];
              color: Color = Blue;
              speed: float = -1.5 (deprecated);
              friendly: bool = false (priority: 3);
            }
            "#,
        )
        .unwrap();

        let Declaration::Table(monster) = &schema.declarations[0] else {
            panic!("expected a table, got {:?}", schema.declarations[0]);
        };
        assert_eq!(monster.name, "Monster");
        assert_eq!(monster.line, 2);
        assert_eq!(monster.fields.len(), 7);

        let hp = &monster.fields[1];
        assert_eq!(hp.type_name, "short");
        assert_eq!(hp.default_value, Some(Literal::Integer(100)));

        let name = &monster.fields[2];
        let names: Vec<_> = name.metadata.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["required", "key"]);

        let inventory = &monster.fields[3];
        assert!(inventory.is_array);
        assert_eq!(inventory.type_name, "ubyte");

        assert_eq!(monster.fields[4].default_value, Some(Literal::Ident("Blue".into())));
        assert_eq!(monster.fields[5].default_value, Some(Literal::Float(-1.5)));
        assert_eq!(monster.fields[6].default_value, Some(Literal::Bool(false)));
        assert_eq!(
            monster.fields[6].metadata[0],
            MetadataEntry { name: "priority".into(), value: Some(Literal::Integer(3)) }
        );
    }

    #[test]
    fn test_parse_errors_carry_positions() {
        let err = parse("table T { x int; }").unwrap_err();
        match err {
            FlowflatError::ParseError { msg, line, column } => {
                assert_eq!((line, column), (1, 13));
                assert!(msg.contains("\":\""), "{}", msg);
            }
            other => panic!("expected a parse error, got {:?}", other),
        }

        assert!(matches!(parse("struct S {}"), Err(FlowflatError::ParseError { .. })));
        assert!(matches!(parse("table T { x: int;"), Err(FlowflatError::ParseError { .. })));
        assert!(matches!(parse("message M {}"), Err(FlowflatError::ParseError { .. })));
    }
}
