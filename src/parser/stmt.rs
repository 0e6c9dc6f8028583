use std::rc::Rc;

use crate::{
    ast::{
        ast::{Expr, Stmt},
        statements::{
            AssignmentStmt, BlockStmt, BreakStmt, ExpressionStmt, FnDeclStmt, GlobalDeclStmt,
            IfStmt, ImportSelection, Parameter, ReturnStmt, StructDeclStmt, StructField, UseStmt,
            VarDeclStmt, WhileStmt,
        },
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    lexer::tokens::TokenKind,
    parser::{expr::parse_expr, lookups::BindingPower},
    Span,
};

use super::{parser::Parser, types::parse_type};

pub fn parse_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    if let Some(handler) = parser
        .get_stmt_lookup()
        .get(&parser.current_token_kind())
        .copied()
    {
        return handler(parser);
    }

    let expr = parse_expr(parser, BindingPower::Default)?;

    if parser.current_token_kind() == TokenKind::Assignment {
        return parse_assignment_stmt(parser, expr);
    }

    Ok(Stmt::Expression(ExpressionStmt {
        span: expr.get_span().clone(),
        expression: expr,
    }))
}

fn parse_assignment_stmt(parser: &mut Parser, assignee: Expr) -> Result<Stmt, Error> {
    if !matches!(assignee, Expr::Symbol(_) | Expr::Member(_) | Expr::Index(_)) {
        return Err(Error::new(
            ErrorImpl::InvalidAssignmentTarget,
            assignee.get_span().start.clone(),
        ));
    }

    parser.advance();
    let value = parse_expr(parser, BindingPower::Default)?;

    Ok(Stmt::Assignment(AssignmentStmt {
        span: Span {
            start: assignee.get_span().start.clone(),
            end: value.get_span().end.clone(),
        },
        assignee,
        value,
    }))
}

/// Parses statements until one of `terminators`, which is left unconsumed.
pub fn parse_block(parser: &mut Parser, terminators: &[TokenKind]) -> Result<BlockStmt, Error> {
    let start = parser.get_position();
    let mut body = vec![];

    parser.skip_newlines();
    while !parser.current_token().is_one_of_many(terminators) {
        if !parser.has_tokens() {
            return Err(Error::new(
                ErrorImpl::UnexpectedTokenDetailed {
                    token: parser.current_token().value.clone(),
                    message: String::from("expected `end`"),
                },
                parser.get_position(),
            ));
        }

        body.push(parse_stmt(parser)?);
        parser.expect_terminator()?;
        parser.skip_newlines();
    }

    Ok(BlockStmt {
        body,
        span: Span {
            start,
            end: parser.get_position(),
        },
    })
}

fn expect_identifier(parser: &mut Parser, context: &str) -> Result<String, Error> {
    let error = Error::new(
        ErrorImpl::UnexpectedTokenDetailed {
            token: parser.current_token().value.clone(),
            message: format!("expected identifier {}", context),
        },
        parser.get_position(),
    );
    Ok(parser.expect_error(TokenKind::Identifier, Some(error))?.value)
}

pub fn parse_var_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let identifier = expect_identifier(parser, "during variable declaration")?;
    parser.expect(TokenKind::Colon)?;
    let explicit_type = parse_type(parser, BindingPower::Default)?;

    let assigned_value = if parser.current_token_kind() == TokenKind::Assignment {
        parser.advance();
        Some(parse_expr(parser, BindingPower::Default)?)
    } else {
        None
    };

    Ok(Stmt::VarDecl(VarDeclStmt {
        identifier,
        explicit_type,
        assigned_value,
        span: Span {
            start,
            end: parser.last_end(),
        },
    }))
}

pub fn parse_global_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let identifier = expect_identifier(parser, "during global declaration")?;
    parser.expect(TokenKind::Colon)?;
    let explicit_type = parse_type(parser, BindingPower::Default)?;

    let error = Error::new(
        ErrorImpl::UnexpectedTokenDetailed {
            token: parser.current_token().value.clone(),
            message: String::from("expected initial value in global declaration"),
        },
        parser.get_position(),
    );
    parser.expect_error(TokenKind::Assignment, Some(error))?;
    let assigned_value = parse_expr(parser, BindingPower::Default)?;

    Ok(Stmt::GlobalDecl(Rc::new(GlobalDeclStmt {
        identifier,
        explicit_type,
        assigned_value,
        span: Span {
            start,
            end: parser.last_end(),
        },
    })))
}

pub fn parse_if_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let condition = parse_expr(parser, BindingPower::Default)?;
    parser.skip_newlines();
    parser.expect(TokenKind::Then)?;

    let then_body = parse_block(parser, &[TokenKind::Else, TokenKind::End])?;

    let else_body = if parser.current_token_kind() == TokenKind::Else {
        parser.advance();
        Some(parse_block(parser, &[TokenKind::End])?)
    } else {
        None
    };

    parser.expect(TokenKind::End)?;

    Ok(Stmt::If(IfStmt {
        condition,
        then_body,
        else_body,
        span: Span {
            start,
            end: parser.last_end(),
        },
    }))
}

pub fn parse_while_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let condition = parse_expr(parser, BindingPower::Default)?;
    parser.skip_newlines();
    parser.expect(TokenKind::Do)?;

    let body = parse_block(parser, &[TokenKind::End])?;
    parser.expect(TokenKind::End)?;

    Ok(Stmt::While(WhileStmt {
        condition,
        body,
        span: Span {
            start,
            end: parser.last_end(),
        },
    }))
}

pub fn parse_fn_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let identifier = expect_identifier(parser, "after `func`")?;

    parser.expect(TokenKind::OpenParen)?;

    let mut parameters = Vec::new();
    parser.skip_newlines();
    while parser.current_token_kind() != TokenKind::CloseParen {
        let name = expect_identifier(parser, "in parameter list")?;
        parser.expect(TokenKind::Colon)?;
        let type_ = parse_type(parser, BindingPower::Default)?;
        parameters.push(Parameter { name, type_ });
        parser.skip_newlines();

        if parser.current_token_kind() == TokenKind::Comma {
            parser.advance();
            parser.skip_newlines();
        } else if parser.current_token_kind() != TokenKind::CloseParen {
            return Err(parser.unexpected());
        }
    }

    parser.expect(TokenKind::CloseParen)?;

    let return_type = if parser.current_token_kind() == TokenKind::Arrow {
        parser.advance();
        parse_type(parser, BindingPower::Default)?
    } else {
        Type::void()
    };

    let body = parse_block(parser, &[TokenKind::End])?;
    parser.expect(TokenKind::End)?;

    Ok(Stmt::FnDecl(Rc::new(FnDeclStmt {
        identifier,
        parameters,
        return_type,
        body,
        span: Span {
            start,
            end: parser.last_end(),
        },
    })))
}

pub fn parse_return_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let value = if parser.current_token().is_one_of_many(&[
        TokenKind::Newline,
        TokenKind::EOF,
        TokenKind::End,
        TokenKind::Else,
    ]) {
        None
    } else {
        Some(parse_expr(parser, BindingPower::Default)?)
    };

    Ok(Stmt::Return(ReturnStmt {
        value,
        span: Span {
            start,
            end: parser.last_end(),
        },
    }))
}

pub fn parse_break_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let token = parser.advance().clone();

    Ok(Stmt::Break(BreakStmt { span: token.span }))
}

pub fn parse_struct_decl_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let identifier = expect_identifier(parser, "after `struct`")?;

    let mut fields: Vec<StructField> = Vec::new();
    parser.skip_newlines();
    while parser.current_token_kind() != TokenKind::End {
        let name = expect_identifier(parser, "in struct body")?;
        parser.expect(TokenKind::Colon)?;
        let type_ = parse_type(parser, BindingPower::Default)?;
        fields.push(StructField { name, type_ });

        if parser.current_token_kind() == TokenKind::Comma {
            parser.advance();
        }
        parser.skip_newlines();
    }

    parser.expect(TokenKind::End)?;

    Ok(Stmt::StructDecl(Rc::new(StructDeclStmt {
        identifier,
        fields,
        span: Span {
            start,
            end: parser.last_end(),
        },
    })))
}

pub fn parse_use_stmt(parser: &mut Parser) -> Result<Stmt, Error> {
    let start = parser.advance().span.start.clone();

    let mut path = vec![expect_identifier(parser, "after `use`")?];
    while parser.current_token_kind() == TokenKind::Dot {
        parser.advance();
        path.push(expect_identifier(parser, "in module path")?);
    }

    let selection = if parser.current_token_kind() == TokenKind::Select {
        parser.advance();

        if parser.current_token_kind() == TokenKind::Star {
            parser.advance();
            ImportSelection::All
        } else {
            let mut names = vec![expect_identifier(parser, "after `select`")?];
            while parser.current_token_kind() == TokenKind::Comma {
                parser.advance();
                names.push(expect_identifier(parser, "after `,`")?);
            }
            ImportSelection::Names(names)
        }
    } else {
        ImportSelection::Namespace
    };

    Ok(Stmt::Use(Rc::new(UseStmt {
        path,
        selection,
        span: Span {
            start,
            end: parser.last_end(),
        },
    })))
}
