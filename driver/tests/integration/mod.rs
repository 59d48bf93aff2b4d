mod clone_import_test;
mod create_mode_test;
mod full_import_test;
mod incremental_import_test;
mod source_selection_test;
mod view_import_test;
