pub mod import_use_case;
