//! Line tokenizing shared by both consoles.
//!
//! Input errors stop here: a bad line produces a [`CommandError`] and never
//! reaches the image or the room.

use std::str::FromStr;
use thiserror::Error;

use patchwork_core::{Color, Vec2};

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("unknown command {0:?}, type `help`")]
    Unknown(String),
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid {what}: {token:?}")]
    Invalid { what: &'static str, token: String },
    #[error("unexpected argument {0:?}")]
    Trailing(String),
    #[error("{0}")]
    Rejected(&'static str),
}

/// Result of running one command.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Text(String),
    Quit,
}

pub struct Args<'a> {
    tokens: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    pub fn new(line: &'a str) -> Self {
        Self {
            tokens: line.split_whitespace(),
        }
    }

    pub fn next_word(&mut self) -> Option<&'a str> {
        self.tokens.next()
    }

    pub fn word(&mut self, what: &'static str) -> Result<&'a str, CommandError> {
        self.tokens.next().ok_or(CommandError::Missing(what))
    }

    pub fn parse<T: FromStr>(&mut self, what: &'static str) -> Result<T, CommandError> {
        let token = self.word(what)?;
        token.parse().map_err(|_| CommandError::Invalid {
            what,
            token: token.to_string(),
        })
    }

    /// A finite float.
    pub fn number(&mut self, what: &'static str) -> Result<f32, CommandError> {
        let token = self.word(what)?;
        match token.parse::<f32>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(CommandError::Invalid {
                what,
                token: token.to_string(),
            }),
        }
    }

    pub fn point(&mut self, what: &'static str) -> Result<Vec2, CommandError> {
        let x = self.number(what)?;
        let y = self.number(what)?;
        Ok(Vec2::new(x, y))
    }

    pub fn color(&mut self) -> Result<Color, CommandError> {
        let r = self.parse("red component")?;
        let g = self.parse("green component")?;
        let b = self.parse("blue component")?;
        Ok(Color::new(r, g, b))
    }

    /// Everything not consumed yet, joined by single spaces.
    pub fn rest(&mut self) -> String {
        self.tokens.by_ref().collect::<Vec<_>>().join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.clone().next().is_none()
    }

    pub fn finish(&mut self) -> Result<(), CommandError> {
        match self.tokens.next() {
            Some(extra) => Err(CommandError::Trailing(extra.to_string())),
            None => Ok(()),
        }
    }
}
