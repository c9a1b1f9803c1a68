pub mod op_reader;
