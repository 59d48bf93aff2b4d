mod table_import_test;
