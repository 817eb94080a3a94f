use changecheck::Connection;

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let db = Connection::open_in_memory()?;
	db.execute("CREATE TABLE test_table (id INTEGER, name TEXT)")?;

	let insert_result = db.prepare("INSERT INTO test_table VALUES (1, 'test1')")?.run()?;
	let select_result = db.prepare("SELECT * FROM test_table")?.run()?;

	println!("insert_result: {insert_result:?}");
	println!("select_result: {select_result:?}");

	db.close()?;
	Ok(())
}
