//! C FFI bindings for rxtab-core
//!
//! This crate provides a C-compatible API for use from C/C++ applications: parse a file with a
//! profile, then walk the resulting tables and misreads through an opaque handle.

use rxtab_core::{ProfileNode, Table, TableSet};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

/// Opaque handle to the tables and misreads of one parse
pub struct FfiParseResult {
    tables: TableSet,
    misreads: Vec<String>,
}

fn parse_with_profile(profile: &Path, input: &Path) -> rxtab_core::Result<FfiParseResult> {
    let mut parser = ProfileNode::load(profile)?.build_parser()?;
    parser.fill_path(input)?;
    let (tables, misreads) = parser.into_parts();
    Ok(FfiParseResult { tables, misreads })
}

unsafe fn path_arg<'a>(s: *const c_char) -> Option<&'a Path> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok().map(Path::new)
}

unsafe fn table_at<'a>(result: *const FfiParseResult, table: usize) -> Option<&'a Table> {
    if result.is_null() {
        return None;
    }
    (*result).tables.iter().nth(table)
}

fn into_c_string(s: &str) -> *mut c_char {
    CString::new(s)
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Parse `input_path` with the profile stored at `profile_path`
///
/// # Safety
/// - `profile_path` and `input_path` must be valid C strings
/// - Returns null on error
/// - Free the result with `rxtab_free_result`
#[no_mangle]
pub unsafe extern "C" fn rxtab_parse_file(
    profile_path: *const c_char,
    input_path: *const c_char,
) -> *mut FfiParseResult {
    let (Some(profile), Some(input)) = (path_arg(profile_path), path_arg(input_path)) else {
        return ptr::null_mut();
    };

    match parse_with_profile(profile, input) {
        Ok(result) => Box::into_raw(Box::new(result)),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a parse result
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file` or null
#[no_mangle]
pub unsafe extern "C" fn rxtab_free_result(result: *mut FfiParseResult) {
    if !result.is_null() {
        drop(Box::from_raw(result));
    }
}

/// Get the number of tables
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file`
#[no_mangle]
pub unsafe extern "C" fn rxtab_table_count(result: *const FfiParseResult) -> usize {
    if result.is_null() {
        return 0;
    }
    (*result).tables.len()
}

/// Get a table name by index
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `rxtab_free_string`
#[no_mangle]
pub unsafe extern "C" fn rxtab_table_name(result: *const FfiParseResult, table: usize) -> *mut c_char {
    table_at(result, table)
        .map(|t| into_c_string(&t.name))
        .unwrap_or(ptr::null_mut())
}

/// Get the column count of a table
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file`
#[no_mangle]
pub unsafe extern "C" fn rxtab_column_count(result: *const FfiParseResult, table: usize) -> usize {
    table_at(result, table).map_or(0, Table::column_count)
}

/// Get a column's label (its header name when one was read) by index
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file`
/// - Returns null if an index is out of bounds
/// - Caller must free the returned string with `rxtab_free_string`
#[no_mangle]
pub unsafe extern "C" fn rxtab_column_label(
    result: *const FfiParseResult,
    table: usize,
    col: usize,
) -> *mut c_char {
    table_at(result, table)
        .and_then(|t| t.columns.get(col))
        .map(|c| into_c_string(c.display_name()))
        .unwrap_or(ptr::null_mut())
}

/// Get the row count of a table
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file`
#[no_mangle]
pub unsafe extern "C" fn rxtab_row_count(result: *const FfiParseResult, table: usize) -> usize {
    table_at(result, table).map_or(0, Table::row_count)
}

/// Get a cell value as a string; empty cells are empty strings
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file`
/// - Returns null if an index is out of bounds
/// - Caller must free the returned string with `rxtab_free_string`
#[no_mangle]
pub unsafe extern "C" fn rxtab_cell(
    result: *const FfiParseResult,
    table: usize,
    row: usize,
    col: usize,
) -> *mut c_char {
    table_at(result, table)
        .and_then(|t| t.rows.get(row))
        .and_then(|r| r.get(col))
        .map(|v| into_c_string(&v.to_string_value()))
        .unwrap_or(ptr::null_mut())
}

/// Get the number of lines no pattern matched
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file`
#[no_mangle]
pub unsafe extern "C" fn rxtab_misread_count(result: *const FfiParseResult) -> usize {
    if result.is_null() {
        return 0;
    }
    (*result).misreads.len()
}

/// Get a misread line by index
///
/// # Safety
/// - `result` must be a valid pointer returned by `rxtab_parse_file`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `rxtab_free_string`
#[no_mangle]
pub unsafe extern "C" fn rxtab_misread_line(result: *const FfiParseResult, index: usize) -> *mut c_char {
    if result.is_null() {
        return ptr::null_mut();
    }
    (&(*result).misreads)
        .get(index)
        .map(|line| into_c_string(line))
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a rxtab_* function or null
#[no_mangle]
pub unsafe extern "C" fn rxtab_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}
