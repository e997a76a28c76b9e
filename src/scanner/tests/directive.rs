/*
 * This Source Code Form is subject to the terms of the
 * Mozilla Public License, v. 2.0. If a copy of the MPL
 * was not distributed with this file, You can obtain one at http://mozilla.org/MPL/2.0/.
 */

//! Test cases specific to %YAML and unknown directives

use pretty_assertions::assert_eq;

use super::*;

#[test]
fn version_directive()
{
    let data = "%YAML 1.2\n---\nhi";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | VersionDirective(1, 2),
        | DocumentStart,
        | Scalar(cow!("hi"), Plain),
        | StreamEnd,
        @ None
    );

    assert_eq!(s.scan.stats, stats_of(data));
}

#[test]
fn version_directive_with_comment()
{
    let data = "%YAML 1.1 # legacy streams\n---\nhi";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | VersionDirective(1, 1),
        | DocumentStart,
        | Scalar(cow!("hi"), Plain),
        | StreamEnd,
        @ None
    );
}

#[test]
fn unknown_directive_skipped_with_warning()
{
    // A '%SOMETHING' directive is not an error, the line is
    // skipped and scanning continues
    let data = "%WIDGETS are not a yaml concept\nkey: value\n";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | BlockMappingStart,
        | Key,
        | Scalar(cow!("key"), Plain),
        | Value,
        | Scalar(cow!("value"), Plain),
        | BlockEnd,
        | StreamEnd,
        @ None
    );
}

#[test]
fn version_directive_missing_minor()
{
    let data = "%YAML 1.\n---";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        > ScanError::InvalidVersion
    );
}

#[test]
fn directive_must_start_line()
{
    // Mid line '%' is plain scalar content
    let data = "50% discount";
    let mut s = ScanIter::new(data);

    tokens!(s =>
        | StreamStart(StreamEncoding::UTF8),
        | Scalar(cow!("50% discount"), Plain),
        | StreamEnd,
        @ None
    );
}
