/*!
# Barcode Desk

A browser-based form for issuing, editing, deleting and browsing product
barcodes, with a single spreadsheet file as the database.

## Overview

Every issued barcode is 13 digits: the fixed prefix `88061987` followed by
five random digits that no other record uses. Each barcode carries a part
code, a product name, a color, a size, and creation/update timestamps.

## Architecture

### Frontend Layer
- **Technologies**: HTML, vanilla JavaScript
- One page with the issue, edit, delete and browse views, talking to the
  JSON API below

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - Record table - in-memory rows and the issue/edit/delete mutations
  - Barcode generator - random suffixes with a bounded fallback scan
  - Session guard - one editor at a time, enforced with an expiring token
    and an OS lock on the backing file
  - Desk - runs each user action and collects the messages shown to the user

### Data Persistence Layer
- One `.xlsx` workbook, read with calamine and written with rust_xlsxwriter
- The whole table is rewritten on every change, through a temporary file
  renamed over the original
- CSV and XLSX downloads of the current table

## Modules

- **record**: Record and Table types and their mutations
- **barcode**: Barcode generation and validation
- **store**: Spreadsheet persistence
- **guard**: Editing session exclusion
- **notice**: User-visible messages
- **desk**: User actions
- **downloader**: Export functionality (CSV, XLSX)
- **config**: Runtime settings
- **app**: Routing and handlers (feature `web`)

## REST API Endpoints

- `POST /api/session` - Start or resume the editing session
- `POST /api/session/end` - Release the desk for another user
- `GET /api/records` - Current table
- `POST /api/records` - Issue the generated barcode
- `PUT /api/records/{barcode}` - Edit a record
- `DELETE /api/records/{barcode}` - Delete a record
- `POST /api/barcode` - Generate a candidate barcode
- `POST /api/refresh` - Reload the spreadsheet
- `GET /api/export/csv`, `GET /api/export/xlsx` - Downloads
*/

pub mod barcode;
pub mod config;
pub mod desk;
pub mod downloader;
pub mod guard;
pub mod notice;
pub mod record;
pub mod store;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod error;

pub use barcode::{BarcodeError, BarcodeGenerator};
pub use config::Config;
pub use desk::{Desk, DeskError, DeskView};
pub use guard::{GuardError, SessionGuard};
pub use notice::{Level, Notice, Notices};
pub use record::{Record, RecordFields, Table, TableError};
pub use store::{RecordStore, StoreError};
