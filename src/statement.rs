use std::io::Write;

use crate::error::{Result, StorageError};
use crate::row::Row;
use crate::schema::RowLayout;
use crate::table::Table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert(Row),
    Select,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    NegativeId,
    StringTooLong,
    SyntaxError,
    Unrecognized,
}

impl Statement {
    pub fn prepare(input: &str, layout: &RowLayout) -> std::result::Result<Self, PrepareError> {
        let mut tokens = input.split_whitespace();
        match tokens.next() {
            Some("select") => Ok(Statement::Select),
            Some("insert") => {
                let args: Vec<&str> = tokens.collect();
                let [id, username, email] = args[..] else {
                    return Err(PrepareError::SyntaxError);
                };
                Ok(Statement::Insert(prepare_row(id, username, email, layout)?))
            }
            _ => Err(PrepareError::Unrecognized),
        }
    }

    /// Runs the statement against `table`, writing the shell's response to `out`.
    ///
    /// A full table is reported to `out`; any other error is returned.
    pub fn execute(&self, table: &mut Table, out: &mut impl Write) -> Result<()> {
        match self {
            Statement::Insert(row) => match table.insert(row) {
                Ok(()) => writeln!(out, "Executed.")?,
                Err(StorageError::TableFull { .. }) => writeln!(out, "Error: Table full.")?,
                Err(e) => return Err(e),
            },
            Statement::Select => {
                for row in table.scan() {
                    writeln!(out, "{}", row?)?;
                }
                writeln!(out, "Executed.")?;
            }
        }
        Ok(())
    }
}

fn prepare_row(
    id: &str,
    username: &str,
    email: &str,
    layout: &RowLayout,
) -> std::result::Result<Row, PrepareError> {
    let id: i64 = id.parse().map_err(|_| PrepareError::SyntaxError)?;
    if id < 0 {
        return Err(PrepareError::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| PrepareError::SyntaxError)?;
    if username.len() > layout.username.width || email.len() > layout.email.width {
        return Err(PrepareError::StringTooLong);
    }
    // Columns are NUL-padded, so an embedded NUL would truncate the value.
    if username.contains('\0') || email.contains('\0') {
        return Err(PrepareError::SyntaxError);
    }
    Ok(Row::new(id, username, email))
}
