//! Type parsing implementation.
//!
//! This module handles parsing of type annotations. It supports:
//!
//! - Primitive types (`int`, `float`, `string`/`str`, `bool`, `bytes`, `void`)
//! - Struct types (identifiers)
//! - Array types, with or without a size (`int[5]`, `int[]`)
//! - Reference types (`ref T`)
//! - Map types (`map[K, V]`)
//!
//! Similar to expression parsing, it uses NUD/LED handlers with
//! binding powers for parsing nested type expressions.

use std::collections::HashMap;

use crate::{
    ast::types::Type,
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
};

use super::{lookups::BindingPower, parser::Parser};

/// Type alias for type null denotation handler functions.
pub type TypeNUDHandler = fn(&mut Parser) -> Result<Type, Error>;

/// Type alias for type left denotation handler functions.
pub type TypeLEDHandler = fn(&mut Parser, Type, BindingPower) -> Result<Type, Error>;

/// Type alias for type NUD lookup table.
pub type TypeNUDLookup = HashMap<TokenKind, TypeNUDHandler>;

/// Type alias for type LED lookup table.
pub type TypeLEDLookup = HashMap<TokenKind, TypeLEDHandler>;

/// Type alias for type binding power lookup table.
pub type TypeBPLookup = HashMap<TokenKind, BindingPower>;

/// Initializes the type parsing lookup tables.
pub fn create_token_type_lookups(parser: &mut Parser) {
    parser.type_nud(TokenKind::TypeInt, parse_primitive_type);
    parser.type_nud(TokenKind::TypeFloat, parse_primitive_type);
    parser.type_nud(TokenKind::TypeString, parse_primitive_type);
    parser.type_nud(TokenKind::TypeStr, parse_primitive_type);
    parser.type_nud(TokenKind::TypeBool, parse_primitive_type);
    parser.type_nud(TokenKind::TypeBytes, parse_primitive_type);
    parser.type_nud(TokenKind::TypeVoid, parse_primitive_type);
    parser.type_nud(TokenKind::Identifier, parse_symbol_type);
    parser.type_nud(TokenKind::Ref, parse_ref_type);

    parser.type_led(TokenKind::OpenBracket, BindingPower::Call, parse_array_type);
}

pub fn parse_primitive_type(parser: &mut Parser) -> Result<Type, Error> {
    let token = parser.advance().clone();

    Type::primitive(&token.value).ok_or_else(|| {
        Error::new(
            ErrorImpl::UnknownType {
                type_: token.value.clone(),
            },
            token.span.start.clone(),
        )
    })
}

/// A struct name, or `map[K, V]`.
pub fn parse_symbol_type(parser: &mut Parser) -> Result<Type, Error> {
    let token = parser.expect(TokenKind::Identifier)?;

    if token.value == "map" && parser.current_token_kind() == TokenKind::OpenBracket {
        parser.advance();
        let key = parse_type(parser, BindingPower::Default)?;
        parser.expect(TokenKind::Comma)?;
        let value = parse_type(parser, BindingPower::Default)?;
        parser.expect(TokenKind::CloseBracket)?;

        return Ok(Type::map(key, value));
    }

    Ok(Type::Struct(token.value))
}

pub fn parse_ref_type(parser: &mut Parser) -> Result<Type, Error> {
    parser.advance();
    let inner = parse_type(parser, BindingPower::Default)?;

    Ok(Type::reference(inner))
}

pub fn parse_array_type(parser: &mut Parser, left: Type, _bp: BindingPower) -> Result<Type, Error> {
    parser.expect(TokenKind::OpenBracket)?;

    let size = if parser.current_token_kind() == TokenKind::Int {
        let token = parser.advance().clone();
        match token.value.parse::<usize>() {
            Ok(size) => Some(size),
            Err(_) => {
                return Err(Error::new(
                    ErrorImpl::NumberParseError { token: token.value },
                    token.span.start,
                ))
            }
        }
    } else {
        None
    };

    parser.expect(TokenKind::CloseBracket)?;

    Ok(Type::array(left, size))
}

pub fn parse_type(parser: &mut Parser, bp: BindingPower) -> Result<Type, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_type_nud_lookup().get(&token_kind).copied() else {
        return Err(Error::new(
            ErrorImpl::UnexpectedTokenDetailed {
                token: parser.current_token().value.clone(),
                message: String::from("expected a type"),
            },
            parser.get_position(),
        ));
    };

    let mut left = nud(parser)?;

    // While LED and current BP is less than BP of current token, continue parsing lhs
    while let Some(next_bp) = parser
        .get_type_bp_lookup()
        .get(&parser.current_token_kind())
        .copied()
    {
        if next_bp <= bp {
            break;
        }

        let token_kind = parser.current_token_kind();
        let Some(led) = parser.get_type_led_lookup().get(&token_kind).copied() else {
            return Err(parser.unexpected());
        };

        left = led(parser, left, next_bp)?;
    }

    Ok(left)
}
