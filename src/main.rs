use stratum::record::{Attribute, CmpOp, DataType, Expr, Record, Schema, Table, Value};

fn main() -> stratum::Result<()> {
    env_logger::init();

    println!("Stratum - a single-file relational storage engine");
    println!("=================================================\n");

    let path = "demo.tbl";

    let schema = Schema::new(
        vec![
            Attribute::new("id", DataType::Int),
            Attribute::new("name", DataType::Text(12)),
            Attribute::new("score", DataType::Float),
        ],
        vec![0],
    );

    Table::create(path, &schema)?;
    println!("Created table: {}", path);

    let mut table = Table::open(path)?;

    for (id, name, score) in [(1, "ada", 9.5f32), (2, "grace", 8.0), (3, "alan", 7.25)] {
        let mut record = Record::new(table.schema());
        record.set_attr(table.schema(), 0, &Value::Int(id))?;
        record.set_attr(table.schema(), 1, &Value::Text(name.into()))?;
        record.set_attr(table.schema(), 2, &Value::Float(score))?;

        let rid = table.insert(&mut record)?;
        println!("Inserted {} at {}", name, rid);
    }
    println!("\nTuple count: {}", table.tuple_count());

    // everyone with a score above 7.5
    let pred = Expr::cmp(CmpOp::Gt, Expr::attr(2), Expr::constant(7.5f32));
    println!("\nRecords with score > 7.5:");
    {
        let mut scan = table.scan(&pred);
        while let Some(row) = scan.next_record()? {
            println!(
                "  {} {} {}",
                row.get_attr(table.schema(), 0)?,
                row.get_attr(table.schema(), 1)?,
                row.get_attr(table.schema(), 2)?,
            );
        }
    }

    let pool = table.pool();
    println!(
        "\nBuffer pool ({:?}): {} reads, {} writes",
        pool.policy(),
        pool.read_count(),
        pool.write_count()
    );

    table.close()?;
    Table::destroy(path)?;
    println!("\nDemo completed successfully!");
    Ok(())
}
