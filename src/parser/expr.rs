use crate::{
    ast::{
        ast::Expr,
        expressions::{
            ArrayLiteralExpr, BinaryExpr, BinaryOperator, BoolExpr, BytesExpr, CallExpr,
            FStringExpr, FStringPart, FloatExpr, IndexExpr, IntExpr, MapLiteralExpr, MemberExpr,
            NullExpr, PrefixExpr, PrefixOperator, RefExpr, StringExpr, SymbolExpr, ZerosExpr,
        },
    },
    errors::errors::{Error, ErrorImpl},
    lexer::{
        lexer::{tokenize_with, unescape, Lexer},
        tokens::TokenKind,
    },
    Position, Span,
};

use super::{lookups::BindingPower, parser::Parser};

pub fn parse_expr(parser: &mut Parser, bp: BindingPower) -> Result<Expr, Error> {
    // First parse NUD
    let token_kind = parser.current_token_kind();
    let Some(nud) = parser.get_nud_lookup().get(&token_kind).copied() else {
        return Err(parser.unexpected());
    };

    let mut left = nud(parser)?;

    // While LED and current BP is less than BP of current token, continue parsing lhs
    while let Some(next_bp) = parser
        .get_bp_lookup()
        .get(&parser.current_token_kind())
        .copied()
    {
        if next_bp <= bp {
            break;
        }

        let token_kind = parser.current_token_kind();
        let Some(led) = parser.get_led_lookup().get(&token_kind).copied() else {
            return Err(parser.unexpected());
        };

        left = led(parser, left, next_bp)?;
    }

    Ok(left)
}

pub fn parse_primary_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.current_token().clone();

    let expr = match token.kind {
        TokenKind::Int => match token.value.parse::<i64>() {
            Ok(value) => Expr::Int(IntExpr {
                value,
                span: token.span.clone(),
            }),
            Err(_) => {
                return Err(Error::new(
                    ErrorImpl::NumberParseError { token: token.value },
                    token.span.start,
                ))
            }
        },
        TokenKind::Float => match token.value.parse::<f64>() {
            Ok(value) => Expr::Float(FloatExpr {
                value,
                span: token.span.clone(),
            }),
            Err(_) => {
                return Err(Error::new(
                    ErrorImpl::NumberParseError { token: token.value },
                    token.span.start,
                ))
            }
        },
        TokenKind::String => Expr::String(StringExpr {
            value: token.value.clone(),
            span: token.span.clone(),
        }),
        TokenKind::Bytes => Expr::Bytes(BytesExpr {
            // The lexer stores one char per byte.
            value: token.value.chars().map(|c| c as u32 as u8).collect(),
            span: token.span.clone(),
        }),
        TokenKind::True | TokenKind::False => Expr::Bool(BoolExpr {
            value: token.kind == TokenKind::True,
            span: token.span.clone(),
        }),
        TokenKind::Null => Expr::Null(NullExpr {
            span: token.span.clone(),
        }),
        TokenKind::Identifier => Expr::Symbol(SymbolExpr {
            value: token.value.clone(),
            span: token.span.clone(),
        }),
        _ => return Err(parser.unexpected()),
    };

    parser.advance();
    Ok(expr)
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Dash => Some(BinaryOperator::Subtract),
        TokenKind::Star => Some(BinaryOperator::Multiply),
        TokenKind::Slash => Some(BinaryOperator::Divide),
        TokenKind::Percent => Some(BinaryOperator::Modulo),
        TokenKind::Greater => Some(BinaryOperator::Greater),
        TokenKind::GreaterEquals => Some(BinaryOperator::GreaterEquals),
        TokenKind::Less => Some(BinaryOperator::Less),
        TokenKind::LessEquals => Some(BinaryOperator::LessEquals),
        TokenKind::Equals => Some(BinaryOperator::Equals),
        TokenKind::NotEquals => Some(BinaryOperator::NotEquals),
        TokenKind::And => Some(BinaryOperator::And),
        TokenKind::Or => Some(BinaryOperator::Or),
        _ => None,
    }
}

pub fn parse_binary_expr(
    parser: &mut Parser,
    left: Expr,
    bp: BindingPower,
) -> Result<Expr, Error> {
    let Some(operator) = binary_operator(parser.current_token_kind()) else {
        return Err(parser.unexpected());
    };
    parser.advance();
    parser.skip_newlines();

    let right = parse_expr(parser, bp)?;

    Ok(Expr::Binary(BinaryExpr {
        span: Span {
            start: left.get_span().start.clone(),
            end: right.get_span().end.clone(),
        },
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }))
}

pub fn parse_prefix_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let operator_token = parser.advance().clone();

    // `!` binds looser than comparisons: `!a == b` is `!(a == b)`.
    let (operator, bp) = match operator_token.kind {
        TokenKind::Not => (PrefixOperator::Not, BindingPower::Not),
        _ => (PrefixOperator::Negate, BindingPower::Unary),
    };
    let rhs = parse_expr(parser, bp)?;

    Ok(Expr::Prefix(PrefixExpr {
        span: Span {
            start: operator_token.span.start.clone(),
            end: rhs.get_span().end.clone(),
        },
        operator,
        right_expr: Box::new(rhs),
    }))
}

pub fn parse_ref_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.start.clone();
    let target = parse_expr(parser, BindingPower::Unary)?;

    Ok(Expr::Ref(RefExpr {
        span: Span {
            start,
            end: target.get_span().end.clone(),
        },
        target: Box::new(target),
    }))
}

pub fn parse_zeros_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.start.clone();
    parser.expect(TokenKind::OpenParen)?;
    parser.skip_newlines();
    let size = parse_expr(parser, BindingPower::Default)?;
    parser.skip_newlines();
    parser.expect(TokenKind::CloseParen)?;

    Ok(Expr::Zeros(ZerosExpr {
        size: Box::new(size),
        span: Span {
            start,
            end: parser.last_end(),
        },
    }))
}

pub fn parse_grouping_expr(parser: &mut Parser) -> Result<Expr, Error> {
    parser.advance();
    parser.skip_newlines();
    let expr = parse_expr(parser, BindingPower::Default)?;
    parser.skip_newlines();
    parser.expect(TokenKind::CloseParen)?;

    Ok(expr)
}

/// Parses a comma separated list up to `closing`, allowing newlines between items.
fn parse_expr_list(parser: &mut Parser, closing: TokenKind) -> Result<Vec<Expr>, Error> {
    let mut items = vec![];

    parser.skip_newlines();
    while parser.current_token_kind() != closing {
        items.push(parse_expr(parser, BindingPower::Default)?);
        parser.skip_newlines();

        if parser.current_token_kind() == TokenKind::Comma {
            parser.advance();
            parser.skip_newlines();
        } else if parser.current_token_kind() != closing {
            return Err(parser.unexpected());
        }
    }

    parser.expect(closing)?;
    Ok(items)
}

pub fn parse_call_expr(
    parser: &mut Parser,
    left: Expr,
    _bp: BindingPower,
) -> Result<Expr, Error> {
    parser.advance();

    let arguments = parse_expr_list(parser, TokenKind::CloseParen)?;

    Ok(Expr::Call(CallExpr {
        span: Span {
            start: left.get_span().start.clone(),
            end: parser.last_end(),
        },
        callee: Box::new(left),
        arguments,
    }))
}

pub fn parse_index_expr(
    parser: &mut Parser,
    left: Expr,
    _bp: BindingPower,
) -> Result<Expr, Error> {
    parser.advance();
    parser.skip_newlines();
    let index = parse_expr(parser, BindingPower::Default)?;
    parser.skip_newlines();
    parser.expect(TokenKind::CloseBracket)?;

    Ok(Expr::Index(IndexExpr {
        span: Span {
            start: left.get_span().start.clone(),
            end: parser.last_end(),
        },
        object: Box::new(left),
        index: Box::new(index),
    }))
}

pub fn parse_member_expr(
    parser: &mut Parser,
    left: Expr,
    _bp: BindingPower,
) -> Result<Expr, Error> {
    parser.advance();
    let error = Error::new(
        ErrorImpl::UnexpectedTokenDetailed {
            token: parser.current_token().value.clone(),
            message: String::from("expected a field name after `.`"),
        },
        parser.get_position(),
    );
    let property = parser.expect_error(TokenKind::Identifier, Some(error))?;

    Ok(Expr::Member(MemberExpr {
        span: Span {
            start: left.get_span().start.clone(),
            end: property.span.end.clone(),
        },
        object: Box::new(left),
        property: property.value,
    }))
}

pub fn parse_array_literal_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let start = parser.advance().span.start.clone();
    let elements = parse_expr_list(parser, TokenKind::CloseBracket)?;

    Ok(Expr::ArrayLiteral(ArrayLiteralExpr {
        elements,
        span: Span {
            start,
            end: parser.last_end(),
        },
    }))
}

pub fn parse_map_literal_expr(parser: &mut Parser) -> Result<Expr, Error> {
    // {"a": 1, "b": 2}
    let start = parser.advance().span.start.clone();

    let mut entries = vec![];

    parser.skip_newlines();
    while parser.current_token_kind() != TokenKind::CloseCurly {
        let key = parse_expr(parser, BindingPower::Default)?;
        parser.expect(TokenKind::Colon)?;
        parser.skip_newlines();
        let value = parse_expr(parser, BindingPower::Default)?;
        entries.push((key, value));
        parser.skip_newlines();

        if parser.current_token_kind() == TokenKind::Comma {
            parser.advance();
            parser.skip_newlines();
        } else if parser.current_token_kind() != TokenKind::CloseCurly {
            return Err(parser.unexpected());
        }
    }

    parser.expect(TokenKind::CloseCurly)?;

    Ok(Expr::MapLiteral(MapLiteralExpr {
        entries,
        span: Span {
            start,
            end: parser.last_end(),
        },
    }))
}

pub fn parse_fstring_expr(parser: &mut Parser) -> Result<Expr, Error> {
    let token = parser.advance().clone();
    let parts = split_fstring(&token.value, &token.span.start)?;

    Ok(Expr::FString(FStringExpr {
        parts,
        span: token.span,
    }))
}

/// Splits the raw body of an f-string into text and `{expr[:spec]}` parts.
fn split_fstring(body: &str, position: &Position) -> Result<Vec<FStringPart>, Error> {
    let mut parts = vec![];
    let mut text = String::new();
    let mut chars = body.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                text.push(ch);
                if let Some(next) = chars.next() {
                    text.push(next);
                }
            }
            '{' => {
                if !text.is_empty() {
                    parts.push(FStringPart::Text(unescape(&text, false)));
                    text.clear();
                }

                let mut inner = String::new();
                let mut depth = 1;
                for next in chars.by_ref() {
                    match next {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    inner.push(next);
                }

                if depth != 0 {
                    return Err(Error::new(
                        ErrorImpl::UnterminatedString {
                            literal: String::from("f-string interpolation"),
                        },
                        position.clone(),
                    ));
                }

                let (source, format_spec) = split_format_spec(&inner);
                parts.push(FStringPart::Expr {
                    expr: parse_embedded_expr(source.trim(), position)?,
                    format_spec,
                });
            }
            _ => text.push(ch),
        }
    }

    if !text.is_empty() {
        parts.push(FStringPart::Text(unescape(&text, false)));
    }

    Ok(parts)
}

/// Finds the first `:` outside of brackets and string literals.
fn split_format_spec(inner: &str) -> (&str, Option<String>) {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in inner.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ':' if depth == 0 => {
                return (&inner[..index], Some(inner[index + 1..].to_string()));
            }
            _ => {}
        }
    }

    (inner, None)
}

fn parse_embedded_expr(source: &str, position: &Position) -> Result<Expr, Error> {
    let tokens = tokenize_with(Lexer::at_position(source.to_string(), position))?;
    let mut parser = Parser::new(tokens, std::rc::Rc::clone(&position.file));

    let expr = parse_expr(&mut parser, BindingPower::Default)?;
    if parser.has_tokens() {
        return Err(parser.unexpected());
    }

    Ok(expr)
}
