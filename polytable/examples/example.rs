use polytable::PolyTable;

#[derive(Debug, Clone, PartialEq, PolyTable)]
#[polytable(module = port, key = id)]
#[polytable(index(fields(node, direction, offset), getter = find_port, unique))]
#[polytable(index(fields(node, direction), getter = get_by_node))]
#[polytable(index(fields(edge), getter = get_by_edge))]
pub struct Port {
    id: u32,
    node: u32,
    direction: Direction,
    offset: u16,
    edge: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Input = 0,
    Output = 1,
}

pub fn main() {
    let mut table = port::Table::new();

    let a = table.insert(Port {
        id: 0,
        node: 0,
        direction: Direction::Input,
        offset: 0,
        edge: 0,
    });

    let b = table.insert(Port {
        id: 1,
        node: 0,
        direction: Direction::Output,
        offset: 1,
        edge: 1,
    });

    table.insert(Port {
        id: 2,
        node: 0,
        direction: Direction::Input,
        offset: 2,
        edge: 1,
    });

    println!("{:#?}", *table);
    println!(
        "ports of node 0 going in: {:?}",
        table
            .get_by_node(0, Direction::Input)
            .filter_map(|h| table.resolve(h).map(|(_, p)| p.offset))
            .collect::<Vec<_>>()
    );
    println!("port at (0, in, 0): {:?}", table.find_port(0, Direction::Input, 0));

    table.remove(b);
    println!("after removing {:?}: {:#?}", b, *table);
    println!(
        "ports on edge 1: {:?}",
        table.get_by_edge(1).collect::<Vec<_>>()
    );
    println!("port {:?} is still {:?}", a, table.resolve(a));
}
